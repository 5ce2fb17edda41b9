pub mod client;
pub mod pkt_line;
