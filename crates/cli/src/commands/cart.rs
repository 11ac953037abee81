//! Cart commands.

use chinchin_client::ChinChinClient;
use chinchin_core::{Cart, EntityId};

use super::print_line;

pub async fn show(client: &ChinChinClient) -> Result<(), Box<dyn std::error::Error>> {
    render(&client.cart().get().await?);
    Ok(())
}

pub async fn add(
    client: &ChinChinClient,
    product_id: &EntityId,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    render_updated(client.cart().add(product_id, quantity).await?.as_ref());
    Ok(())
}

pub async fn remove(client: &ChinChinClient, product_id: &EntityId) -> Result<(), Box<dyn std::error::Error>> {
    render_updated(client.cart().remove(product_id).await?.as_ref());
    Ok(())
}

fn render_updated(cart: Option<&Cart>) {
    match cart {
        Some(cart) => render(cart),
        None => print_line("Cart updated; run `chinchin cart show` to see it"),
    }
}

fn render(cart: &Cart) {
    if cart.items.is_empty() {
        print_line("Cart is empty");
        return;
    }
    for item in &cart.items {
        print_line(&format!(
            "{:>6}  {} x{}  {}",
            item.product_id,
            item.product_name,
            item.quantity,
            item.subtotal()
        ));
    }
    print_line(&format!("Total ({} items): {}", cart.unit_count(), cart.total()));
}
