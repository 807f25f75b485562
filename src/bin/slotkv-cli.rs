//! slotkv interactive client
//!
//! Connects to a server, prints what it receives and sends one request per
//! line typed on stdin. `q` or `Q` ends the session.

use anyhow::{bail, Context};
use slotkv::client::Client;
use slotkv::config::parse_port;
use tokio::io::{AsyncBufReadExt, BufReader};

const MENU: &str = "
-------------------------------------------------------------
Request options:
* [get + id] --> to get the value in the position 'id'
* [set + id + new_value] --> to set the value 'new_value' in the position 'id'
* [q] --> to quit
";

fn usage() -> ! {
    eprintln!("USAGE:\n    slotkv-cli <HOST> <PORT>");
    std::process::exit(1);
}

fn print_received(data: &[u8]) {
    println!("Received data = {}", String::from_utf8_lossy(data).trim_end());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (host, port) = match args.as_slice() {
        [host, port] => (host.clone(), port),
        _ => usage(),
    };
    let port = parse_port(port)?;

    let mut client = Client::connect((host.as_str(), port))
        .await
        .with_context(|| format!("could not reach {}:{}", host, port))?;
    print_received(client.greeting());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("{}", MENU);
        print!("Send your request: ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            // End of input counts as quitting
            None => "q".to_string(),
        };
        let line = line.trim_end();

        if line == "q" || line == "Q" {
            client.quit().await.context("quit failed")?;
            return Ok(());
        }
        if line.is_empty() {
            continue;
        }

        match client.request(line).await {
            Ok(data) => print_received(&data),
            Err(e) => bail!("connection lost: {}", e),
        }
    }
}
