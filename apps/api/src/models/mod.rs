pub mod attempt;
pub mod category;
pub mod profile;
pub mod question;
pub mod score;
