// Person lookup example
// Declares an endpoint from JSON configuration and binds the response onto
// a model that only knows two of the fields the server returns.
//
//   cargo run --example person_lookup -- https://api.example.com Smith

use anyhow::Result;
use restbind_client::{model, Client, ClientConfig, EndpointConfig, EndpointDescriptor};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{error, info};

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Person {
        pub first_name: String => "firstName",
        pub last_name: String => "lastName",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,restbind_client=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let base = args
        .next()
        .unwrap_or_else(|| "https://api.example.com".to_string());
    let name = args.next().unwrap_or_else(|| "Smith".to_string());

    let config: EndpointConfig = serde_json::from_value(serde_json::json!({
        "name": "getPerson",
        "url": format!("{}/person/{{name}}", base),
        "headers": ["Accept: application/json"],
        "method": "GET",
        "onError": "onFailure"
    }))?;
    let descriptor = EndpointDescriptor::try_from(config)?;
    info!("Declared {} with parameters {:?}", descriptor.name(), descriptor.parameters());

    let client = Client::new(ClientConfig::default())?;
    let (tx, rx) = oneshot::channel();
    let received = Arc::new(Mutex::new(Some(tx)));
    let failed = Arc::clone(&received);

    let endpoint = client
        .endpoint::<Person, Person, ()>(descriptor)
        .on_receive(move |_: &Person, person: Person| {
            info!("Received {} {}", person.first_name, person.last_name);
            if let Some(tx) = received.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(());
            }
        })
        .error_handler("onFailure", move |_: &Person, failure| {
            error!("Lookup failed: {}", failure);
            if let Some(tx) = failed.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(());
            }
        })
        .build()?;

    let call = endpoint.call(Person::default(), &[name.as_str()]);
    info!("{} dispatched", call);
    let _ = rx.await;
    Ok(())
}
