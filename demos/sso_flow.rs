//! SSO walkthrough: issue a single-use login link, redeem it, watch the
//! lockout engage on forged tokens.
//!
//! Run with: cargo run --example sso_flow

use std::sync::Arc;

use proconnect::prelude::*;
use proconnect::store::keys;

const SECRET: &[u8; 32] = b"demo-session-signing-secret-32b!";
const SITE: &str = "https://demo-site.example";

struct PrintingSink;

impl SessionSink for PrintingSink {
    fn establish(&self, principal: &Principal) -> Result<(), StoreError> {
        println!("   [session] established for {}", principal.login);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new());

    // A connected web pro: account plus key on file.
    let pro_id = directory.insert("sam", "Sam Mason", "sam@webpros.example", Role::Administrator);
    store.put_value(pro_id, keys::CONNECTION_KEY, "DEMO-KEY-001")?;

    let signer = Arc::new(TokenSigner::new(
        SECRET,
        SITE,
        store.clone(),
        directory.clone(),
    )?);
    let redeemer = SsoRedeemer::new(
        signer,
        store.clone(),
        directory.clone(),
        Arc::new(PrintingSink),
    )
    .on_failure(|| println!("   [hook] sso failure recorded"));

    println!("=== SSO Flow ===\n");

    println!("1. Issue a single-use login link for sam");
    let link = redeemer.issue_link(pro_id)?;
    println!("   {}", &link[..60.min(link.len())]);

    println!("\n2. Redeem it");
    let token = link.split_once("?token=").unwrap().1.to_string();
    match redeemer.redeem(Some(&token))? {
        SsoOutcome::LoggedIn { principal, redirect } => {
            println!("   Logged in {} -> redirect {}", principal.login, redirect);
        }
        other => println!("   Unexpected outcome: {other:?}"),
    }

    println!("\n3. Replay the same link");
    match redeemer.redeem(Some(&token))? {
        SsoOutcome::Denied => println!("   Denied: the token was single-use"),
        other => println!("   Unexpected outcome: {other:?}"),
    }

    println!("\n4. Hammer the endpoint with forged tokens");
    for attempt in 1..=6 {
        let outcome = redeemer.redeem(Some("forged.token.here"))?;
        match outcome {
            SsoOutcome::Denied => println!("   attempt {attempt}: denied"),
            SsoOutcome::LoginRedirect => {
                println!("   attempt {attempt}: locked out, redirected to login")
            }
            other => println!("   attempt {attempt}: unexpected {other:?}"),
        }
    }

    println!("\n5. Login log");
    for entry in redeemer.login_log()? {
        println!("   {} @ {}", entry.login, entry.time);
    }

    println!("\n=== Done ===");
    Ok(())
}
