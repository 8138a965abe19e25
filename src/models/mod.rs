pub mod ticket;

pub use ticket::{NewTicket, Ticket, TicketInputError, TicketPayload};
