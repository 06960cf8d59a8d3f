//! Binary entry point for the odpady API server.

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    odpady_server::run_server().await
}
