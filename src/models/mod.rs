pub mod user;
pub mod member;
pub mod staff;
pub mod publisher;
pub mod category;
pub mod genre;
pub mod book;
pub mod book_genre;
pub mod book_copy;
pub mod loan;
pub mod reservation;
