mod handlers;
mod server;
#[cfg(test)]
mod tests;

pub use server::{serve_router, PoseServer, PoseServerBuilder};
