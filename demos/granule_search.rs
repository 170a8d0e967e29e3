use anyhow::Result;
use cmr::{Client, Concept, Config, concept_id};
use serde_json::json;
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // RUST_LOG=cmr=debug shows each page request.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::new(Config::load()?.with("env", "uat"))?;
    let params = json!({
        "provider": "ORNL_DAAC",
        "polygon": "10,10,30,10,30,20,10,20,10,10"
    });
    println!("Searching {} for {}", client.base_url(), params);

    let mut count = 0usize;
    let mut uniq: HashMap<String, usize> = HashMap::new();
    for item in client.search(Concept::Granules, &params, 9000)? {
        let item = item?;
        count += 1;
        let cid = concept_id(&item).unwrap_or("<missing>").to_string();
        print!("{}, ", cid);
        *uniq.entry(cid).or_default() += 1;
    }
    println!(".");
    println!("{} items, {} unique concept ids", count, uniq.len());
    Ok(())
}
