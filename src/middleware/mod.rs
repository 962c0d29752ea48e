pub mod client_info;
