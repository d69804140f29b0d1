pub mod bonus;
pub mod client;
pub mod feedback;
pub mod giveaway;
pub mod mailing;
pub mod participant;
pub mod promotion;
pub mod redemption;
pub mod setting;
pub mod winner;

pub use giveaway::GiveawayStatus;
pub use mailing::{MailingStatus, MailingTarget};
