//! A three-stage handler: headers, then a greeting, then a footer that reads
//! back the request counter the first stage left on the context stack.
//!
//! ```sh
//! cargo run --example hello_world
//! curl -v http://127.0.0.1:8080/hello
//! ```

use gale_http::connection::{Connection, QueuedStream};
use gale_http::handler::{Continuation, Flow};
use gale_http::protocol::Status;
use gale_http::server::Server;
use tracing::{Level, warn};

const GREETING: &str = "Hello World!\r\n";
const FOOTER: &str = "served in 3 steps\r\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = Server::builder()
        .bind("127.0.0.1:8080")?
        .handler(route)
        .with_tracing(Level::INFO)
        .build()?;

    server.start().await?;
    Ok(())
}

fn route(conn: &mut Connection<QueuedStream>) -> Flow {
    if conn.request().path() != "/hello" {
        return conn.send_status(Status::NOT_FOUND);
    }

    if let Err(e) = conn.context_mut().push(GREETING.len() as u64) {
        warn!(cause = %e, "context stack is full");
        return conn.send_status(Status::INTERNAL_SERVER_ERROR);
    }

    let response = conn.response_mut();
    response.set_content_length((GREETING.len() + FOOTER.len()) as u64);
    if response.set_header("Content-Type", "text/plain; charset=utf-8").is_err() {
        return conn.send_status(Status::INTERNAL_SERVER_ERROR);
    }

    match conn.send_headers(Some(Continuation::new("greeting", greeting))) {
        Ok(()) => Flow::Pending,
        Err(_) => Flow::Done,
    }
}

fn greeting(conn: &mut Connection<QueuedStream>) -> Flow {
    match conn.write(GREETING, Some(Continuation::new("footer", footer))) {
        Ok(()) => Flow::Pending,
        Err(_) => Flow::Done,
    }
}

fn footer(conn: &mut Connection<QueuedStream>) -> Flow {
    match conn.context_mut().pop() {
        Ok(written) => tracing::debug!(written = written.value(), "greeting flushed"),
        Err(e) => warn!(cause = %e, "greeting state missing"),
    }
    let _ = conn.write(FOOTER, None);
    Flow::Done
}
