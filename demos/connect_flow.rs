//! Connect-flow walkthrough: verify a platform key, approve the
//! connection, authenticate an API request, then disconnect.
//!
//! Run with: cargo run --example connect_flow

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use http::header::HeaderName;
use http::HeaderMap;
use proconnect::prelude::*;
use proconnect::DEFAULT_AUTH_HEADER;

const SECRET: &[u8; 32] = b"demo-session-signing-secret-32b!";
const SITE: &str = "https://demo-site.example";

/// Stand-in platform so the demo runs offline. Swap in
/// `HttpPlatformClient::new("https://platform.example/wp-plugin")` for
/// the real thing.
struct DemoPlatform {
    revoked: Mutex<Vec<String>>,
}

impl PlatformClient for DemoPlatform {
    fn verify_key(
        &self,
        key: &str,
        _website_url: &str,
    ) -> Result<Option<ProProfile>, PlatformError> {
        if key == "DEMO-KEY-001" {
            Ok(serde_json::from_value(serde_json::json!({
                "email": "sam@webpros.example",
                "firstName": "Sam",
                "lastName": "Mason",
                "city": "Denver",
                "state": {"name": "Colorado"},
                "country": {"name": "United States"}
            }))
            .ok())
        } else {
            Ok(None)
        }
    }

    fn accept_association(
        &self,
        _key: &str,
        _website_url: &str,
        _token: &str,
    ) -> Result<String, PlatformError> {
        Ok("demo-revoke-credential".to_string())
    }

    fn revoke_association(
        &self,
        revoke_token: &str,
        _website_url: &str,
    ) -> Result<(), PlatformError> {
        self.revoked.lock().unwrap().push(revoke_token.to_string());
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let platform = Arc::new(DemoPlatform {
        revoked: Mutex::new(Vec::new()),
    });

    let admin_id = directory.insert(
        "owner",
        "Site Owner",
        "owner@demo-site.example",
        Role::Administrator,
    );
    let admin = directory.get(admin_id)?.unwrap();

    let signer = Arc::new(TokenSigner::new(
        SECRET,
        SITE,
        store.clone(),
        directory.clone(),
    )?);
    let connector = Connector::new(
        store.clone(),
        directory.clone(),
        platform.clone(),
        signer.clone(),
        SITE,
    );

    println!("=== Connect Flow ===\n");

    println!("1. Web pro submits connection key DEMO-KEY-001");
    let mut connection = connector.by_key("DEMO-KEY-001")?;
    println!("   Platform profile email: {}", connection.email().unwrap());

    println!("\n2. Administrator '{}' approves", admin.login);
    let pro_id = connection.connect(&admin)?;
    let pro = directory.get(pro_id)?.unwrap();
    println!("   Created principal #{} ({})", pro.id, pro.display_name);
    println!("   Role: {:?}", pro.role);
    println!("   Location: {}", connection.location().unwrap_or("-"));

    println!("\n3. Platform calls the API with a bearer token");
    let token = signer.generate("DEMO-KEY-001", pro_id, 3600, false, HashMap::new())?;
    let auth = RequestAuthenticator::new(signer.clone(), directory.clone());
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(DEFAULT_AUTH_HEADER), token.parse()?);
    match auth.authenticate(&headers)? {
        Some(caller) => println!("   Authenticated as: {}", caller.login),
        None => println!("   No token header present"),
    }

    println!("\n4. Owner disconnects the web pro");
    connector.by_id(pro_id)?.disconnect()?;
    let pro = directory.get(pro_id)?.unwrap();
    println!("   Role after disconnect: {:?}", pro.role);
    println!(
        "   Platform notified with: {:?}",
        platform.revoked.lock().unwrap()
    );

    println!("\n5. The old token no longer authenticates");
    match auth.authenticate(&headers) {
        Err(e) => println!("   Rejected ({}), HTTP {}", e, e.http_status()),
        Ok(_) => println!("   Unexpectedly accepted!"),
    }

    println!("\n=== Done ===");
    Ok(())
}
