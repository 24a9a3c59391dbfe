pub mod category;
pub mod customer;
pub mod order;
pub mod quote;
pub mod ticket;
