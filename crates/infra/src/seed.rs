//! Demo catalog loaded into an empty store on startup.

use mousedeck_core::{NewCategory, NewMouse};
use tracing::info;

use crate::repository::{CatalogRepository, RepositoryResult};

const DEMO_IMAGE: &str = "/assets/viperv3pro.avif";

const MICE: &[(&str, f64, &str)] = &[
    ("Razer Viper V3 Pro", 159.99, "Wireless gaming mouse with 30K DPI optical sensor and 95-hour battery life"),
    ("Logitech G Pro X Superlight", 149.99, "Ultra-lightweight wireless gaming mouse weighing less than 63g with HERO 25K sensor"),
    ("Pulsar X2 Mini", 94.95, "Lightweight symmetrical mouse with PAW3395 sensor and ultra-flexible cable"),
    ("SteelSeries Aerox 3 Wireless", 99.99, "Ultra-lightweight (68g) honeycomb design with dual wireless connectivity"),
    ("Glorious Model O", 59.99, "Ultra-lightweight (67g) honeycomb shell with RGB lighting and flexible ascended cord"),
    ("Zowie EC2", 69.99, "Ergonomic design for right-handed users with 3360 sensor and adjustable DPI"),
    ("Endgame Gear XM1r", 79.99, "Low-profile symmetrical shape with Kailh GM 8.0 switches and ultra-flexible cable"),
    ("Finalmouse Starlight-12 Phantom", 189.99, "Ultra-lightweight (42g) magnesium alloy frame with limited edition design"),
    ("Logitech G502 X PLUS", 159.99, "LIGHTSPEED wireless with HERO 25K sensor and LIGHTSYNC RGB"),
    ("HyperX Pulsefire Haste", 49.99, "Lightweight honeycomb shell with TTC Golden micro dustproof switches"),
    ("Razer DeathAdder V3 Pro", 149.99, "Ergonomic wireless esports mouse with Focus Pro 30K sensor"),
    ("Logitech MX Master 3", 99.99, "Advanced wireless mouse for productivity with MagSpeed scrolling"),
];

const CATEGORIES: &[(&str, &str)] = &[
    ("Gaming", "Mice optimized for gaming performance"),
    ("Office", "Mice for everyday office use"),
    ("Wireless", "Mice with wireless connectivity"),
    ("Ergonomic", "Mice designed for comfort and ergonomics"),
];

/// Seeds the demo catalog when the store holds no mice.
///
/// Returns `true` when anything was written.
pub async fn seed_if_empty(repo: &dyn CatalogRepository) -> RepositoryResult<bool> {
    if repo.count_mice().await? > 0 {
        return Ok(false);
    }

    let existing = repo.list_categories().await?;
    for (name, description) in CATEGORIES {
        if existing.iter().any(|c| c.name == *name) {
            continue;
        }
        repo.create_category(NewCategory::new(*name, Some(*description)))
            .await?;
    }

    for (name, price, details) in MICE {
        repo.create_mouse(
            NewMouse::new(*name, *price)
                .with_details(*details)
                .with_image(DEMO_IMAGE),
        )
        .await?;
    }

    info!(mice = MICE.len(), categories = CATEGORIES.len(), "seeded demo catalog");
    Ok(true)
}
