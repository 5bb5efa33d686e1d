pub mod db;
pub mod dispatch;
pub mod server;
pub mod services;
pub mod web;
