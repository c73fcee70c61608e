pub mod api_errors;
pub mod codes;
pub mod fcm;
pub mod mercadopago;
pub mod payments;
pub mod resend;
