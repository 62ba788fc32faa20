use dotenvy::dotenv;
use stockroom::{
    config::{self, catalog::SkuExample},
    core::{category, sku},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the catalog configuration
    let app_config = config::catalog::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and create tables
    let db = config::database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed categories
    category::seed_categories(&db, &app_config.categories)
        .await
        .inspect(|created| info!(created, "Categories seeded."))
        .inspect_err(|e| error!("Failed to seed categories: {}", e))?;

    // 6. Preview and allocate SKUs for the configured examples
    for example in &app_config.sku_examples {
        generate_examples(&db, example, app_config.allocate_count).await?;
    }

    Ok(())
}

async fn generate_examples(
    db: &DatabaseConnection,
    example: &SkuExample,
    count: usize,
) -> Result<()> {
    if category::get_category_by_name(db, &example.category)
        .await?
        .is_none()
    {
        category::create_category(db, &example.category, None).await?;
    }

    let next = sku::preview_sku(db, &example.category, &example.product).await?;
    println!("{} / {}: next SKU {next}", example.category, example.product);

    for _ in 0..count {
        let code = sku::allocate_sku(db, &example.category, &example.product)
            .await
            .inspect_err(|e| error!("SKU allocation failed: {}", e))?;
        println!("  allocated {code}");
    }
    Ok(())
}
