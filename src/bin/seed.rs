use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use quickcart_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::enums::Role,
    entity::products::{ActiveModel as ProductActive, Entity as Products},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    services::auth_service,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    auth_service::ensure_admin_seeded(&orm, &config.admin_email, &config.admin_password).await?;
    let customer_id = ensure_customer(&orm, "user@example.com", "user123").await?;
    seed_products(&orm).await?;

    println!("Seed completed. Demo customer ID: {customer_id}");
    Ok(())
}

async fn ensure_customer(orm: &OrmConn, email: &str, password: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let password_hash = auth_service::hash_password(password)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set("user".to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        role: Set(Role::Customer),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    Ok(user.id)
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    if Products::find().count(orm).await? > 0 {
        return Ok(());
    }

    let samples: [(&str, &str, i64, i32, i32); 3] = [
        ("iPhone 15 Pro", "Electronics", 9_000_000, 39, 5),
        ("MacBook Pro", "Electronics", 14_000_000, 23, 5),
        ("Fresh Apples", "Groceries", 15_000, 99, 10),
    ];

    for (name, category, price, stock, reorder_level) in samples {
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            category: Set(category.to_string()),
            price: Set(price),
            stock: Set(stock),
            reorder_level: Set(reorder_level),
            created_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded sample products.");
    Ok(())
}
