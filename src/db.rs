use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Users table. Role and status are free-text columns validated in the
    // domain layer.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            phone TEXT,
            role TEXT NOT NULL DEFAULT 'member',
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Member profiles (1:1 with users, borrower-specific data)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            date_of_birth TEXT,
            gender TEXT,
            address TEXT,
            library_card_number TEXT NOT NULL UNIQUE,
            membership_start_date TEXT NOT NULL,
            membership_expiry_date TEXT NOT NULL,
            membership_type TEXT NOT NULL DEFAULT 'basic',
            emergency_contact_name TEXT,
            emergency_contact_phone TEXT,
            notes TEXT,
            max_books_allowed INTEGER NOT NULL DEFAULT 5,
            max_days_allowed INTEGER NOT NULL DEFAULT 14,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Staff profiles (1:1 with users, employment data)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            employee_id TEXT NOT NULL UNIQUE,
            hire_date TEXT NOT NULL,
            position TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Catalog reference tables
    for table in ["publishers", "categories", "genres"] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    description TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                table
            ),
        ))
        .await?;
    }

    // Books
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author_name TEXT,
            isbn TEXT UNIQUE,
            description TEXT,
            publisher_id INTEGER,
            category_id INTEGER,
            published_date TEXT,
            pages INTEGER,
            language TEXT NOT NULL DEFAULT 'English',
            format TEXT NOT NULL DEFAULT 'paperback',
            price REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (publisher_id) REFERENCES publishers(id) ON DELETE SET NULL,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Book <-> Genre pivot
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS book_genre (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            genre_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY (genre_id) REFERENCES genres(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Physical copies
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS book_copies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            barcode TEXT NOT NULL UNIQUE,
            book_id INTEGER NOT NULL,
            call_number TEXT,
            condition TEXT NOT NULL DEFAULT 'good',
            status TEXT NOT NULL DEFAULT 'available',
            location TEXT,
            acquisition_date TEXT,
            acquisition_price REAL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Loans
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_copy_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            librarian_id INTEGER,
            borrowed_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            returned_date TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            fine_amount REAL,
            fine_paid INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_copy_id) REFERENCES book_copies(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (librarian_id) REFERENCES users(id) ON DELETE SET NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Reservations
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            reserved_date TEXT NOT NULL,
            expiry_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            book_copy_id INTEGER,
            notified_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (book_copy_id) REFERENCES book_copies(id) ON DELETE SET NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Hot-path indexes
    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_book_copies_status ON book_copies(book_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_loans_copy_returned ON loans(book_copy_id, returned_date)",
        "CREATE INDEX IF NOT EXISTS idx_loans_user_status ON loans(user_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_loans_due_date ON loans(due_date)",
        "CREATE INDEX IF NOT EXISTS idx_reservations_book_status ON reservations(book_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_reservations_user_status ON reservations(user_id, status)",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            stmt.to_owned(),
        ))
        .await?;
    }

    Ok(())
}
