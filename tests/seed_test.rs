//! Demo seed tests.

use openshelf::db;
use openshelf::models::{book, book_copy, user};
use openshelf::seed;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn test_seed_skips_when_users_exist() {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");

    seed::seed_demo_data(&db).await.expect("seed should succeed");

    let users = user::Entity::find().count(&db).await.unwrap();
    let books = book::Entity::find().count(&db).await.unwrap();
    let copies = book_copy::Entity::find().count(&db).await.unwrap();
    assert_eq!(users, 6); // super admin, 2 librarians, 3 members
    assert_eq!(books, 3);
    assert_eq!(copies, 6);

    let admins = user::Entity::find()
        .filter(user::Column::Role.eq("super-admin"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(admins, 1);

    // Seeding again is a no-op once users exist
    seed::seed_demo_data(&db).await.expect("second run should succeed");
    assert_eq!(user::Entity::find().count(&db).await.unwrap(), users);
    assert_eq!(book::Entity::find().count(&db).await.unwrap(), books);
    assert_eq!(book_copy::Entity::find().count(&db).await.unwrap(), copies);
}
