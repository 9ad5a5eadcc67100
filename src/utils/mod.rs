pub mod jwt;
pub mod password;
pub mod period;
pub mod sales_csv;
pub mod ticket_no;
pub mod ticket_pdf;
