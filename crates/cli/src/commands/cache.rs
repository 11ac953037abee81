//! Local cache inspection.

use chinchin_client::ChinChinClient;

use super::print_line;

pub fn status(client: &ChinChinClient) -> Result<(), Box<dyn std::error::Error>> {
    let cache = client.cache();
    cache.purge_if_stale()?;
    let status = cache.status()?;

    match (status.updated_at, status.expires_at) {
        (Some(updated), Some(expires)) => {
            print_line(&format!("Updated: {}", updated.to_rfc3339()));
            print_line(&format!("Expires: {}", expires.to_rfc3339()));
        }
        _ => print_line("Cache is empty"),
    }
    for (kind, count) in status.counts {
        let count = count.map_or_else(|| "-".to_string(), |n| n.to_string());
        print_line(&format!("{kind:<12}{count}"));
    }
    Ok(())
}

pub fn purge(client: &ChinChinClient) -> Result<(), Box<dyn std::error::Error>> {
    client.cache().purge()?;
    print_line("Cache cleared");
    Ok(())
}
