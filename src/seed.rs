use sea_orm::*;

use crate::auth::hash_password;
use crate::models::{book, book_copy, category, genre, publisher, user};
use crate::services::profiles::{self, CreateMemberDto, CreateStaffDto};

/// Seed demo roles, users and a small catalog. Skipped entirely when any
/// user already exists, so it is safe to leave SEED_DEMO set.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let existing = user::Entity::find().count(db).await?;
    if existing > 0 {
        tracing::info!("database already has users, skipping demo seed");
        return Ok(());
    }

    let now = chrono::Utc::now().to_rfc3339();

    // 1. Super admin account (no profile row)
    let admin_password =
        hash_password("password").map_err(|e| DbErr::Custom(format!("hash failed: {}", e)))?;

    user::ActiveModel {
        name: Set("Super Admin".to_owned()),
        email: Set("admin@library.test".to_owned()),
        password_hash: Set(admin_password),
        phone: Set(None),
        role: Set("super-admin".to_owned()),
        status: Set("active".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // 2. Desk staff
    let librarians = [
        ("Sarah Johnson", "sarah@library.test", "Head Librarian"),
        ("Michael Chen", "michael@library.test", "Librarian"),
    ];
    for (name, email, position) in librarians {
        let dto = CreateStaffDto {
            name: name.to_owned(),
            email: email.to_owned(),
            password: "password".to_owned(),
            phone: None,
            status: None,
            role: Some("librarian".to_owned()),
            hire_date: None,
            position: Some(position.to_owned()),
            notes: None,
        };
        profiles::create_staff(db, dto)
            .await
            .map_err(|e| DbErr::Custom(format!("seed staff failed: {}", e)))?;
    }

    // 3. Members
    let members = [
        ("John Smith", "john@example.test"),
        ("Maria Garcia", "maria@example.test"),
        ("David Wilson", "david@example.test"),
    ];
    for (name, email) in members {
        let dto = CreateMemberDto {
            name: name.to_owned(),
            email: email.to_owned(),
            password: "password".to_owned(),
            phone: None,
            status: None,
            date_of_birth: None,
            gender: None,
            address: None,
            membership_start_date: None,
            membership_expiry_date: None,
            membership_type: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            notes: None,
            max_books_allowed: None,
            max_days_allowed: None,
        };
        profiles::create_member(db, dto)
            .await
            .map_err(|e| DbErr::Custom(format!("seed member failed: {}", e)))?;
    }

    // 4. Reference tables
    for name in ["Fiction", "Non-fiction", "Children"] {
        category::ActiveModel {
            name: Set(name.to_owned()),
            description: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    for name in ["Fantasy", "Science Fiction", "Mystery", "Biography"] {
        genre::ActiveModel {
            name: Set(name.to_owned()),
            description: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    for name in ["Penguin Random House", "HarperCollins", "Tor Books"] {
        publisher::ActiveModel {
            name: Set(name.to_owned()),
            description: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    // 5. A small catalog, two copies each
    let books = [
        ("The Hobbit", "J.R.R. Tolkien", "9780547928227"),
        ("Dune", "Frank Herbert", "9780441172719"),
        ("Foundation", "Isaac Asimov", "9780553293357"),
    ];
    for (title, author, isbn) in books {
        let saved = book::ActiveModel {
            title: Set(title.to_owned()),
            author_name: Set(Some(author.to_owned())),
            isbn: Set(Some(isbn.to_owned())),
            description: Set(None),
            publisher_id: Set(None),
            category_id: Set(None),
            published_date: Set(None),
            pages: Set(None),
            language: Set("English".to_owned()),
            format: Set("paperback".to_owned()),
            price: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        for _ in 0..2 {
            book_copy::ActiveModel {
                barcode: Set(uuid::Uuid::new_v4().to_string()),
                book_id: Set(saved.id),
                call_number: Set(None),
                condition: Set("good".to_owned()),
                status: Set("available".to_owned()),
                location: Set(None),
                acquisition_date: Set(None),
                acquisition_price: Set(None),
                notes: Set(None),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::info!("demo data seeded");
    Ok(())
}
