use anyhow::{bail, Context};
use std::io::BufRead;

use crate::auth::password::hash_password;

pub fn handle(password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        bail!("refusing to hash an empty password");
    }

    println!("{}", hash_password(&password)?);
    Ok(())
}
