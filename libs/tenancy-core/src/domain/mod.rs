pub mod connection_string;
pub mod notification;
pub mod subscription;
pub mod tenant;
