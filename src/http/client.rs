use reqwest::Client;
use std::time::Duration;

/// Builds the client shared by every worker of a run.
///
/// The idle pool is sized to the burst so a fan-out of `concurrency` requests
/// can keep its connections for reuse.
pub fn create_client(
    concurrency: u32,
    timeout: Duration,
    connect_timeout: Duration,
    insecure: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .tcp_nodelay(true)
        .gzip(true)
        .brotli(true)
        .user_agent(format!(
            "stressburst/{} (load-testing-tool)",
            env!("CARGO_PKG_VERSION")
        ))
        .danger_accept_invalid_certs(insecure)
        .pool_max_idle_per_host(concurrency as usize)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}
