// Payments: late-fee computation, due-soon reminders, and the payment routes.

pub mod handlers;
pub mod penalty;
pub mod reminders;
