// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (session token) → Elevated (session + admin token)
pub mod public; // Tier 1: No authentication required (/, /health, /auth/login, /auth/continue)
pub mod protected; // Tier 2: Live session required (/auth/*, /roles/*)
pub mod elevated; // Tier 3: Admin token bound to the session required (/admin/*)
