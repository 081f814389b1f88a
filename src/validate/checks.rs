// src/validate/checks.rs
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::process::Stdio;
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error};

use super::gossfile::{AddrCheck, CommandCheck, FileCheck, Gossfile, HttpCheck};
use super::resource::{OutcomeGroup, TestResult};
use super::system::System;
use super::panic_message;

/// A single resource to validate, with its assertions.
#[derive(Debug, Clone)]
pub enum Check {
    Command(String, CommandCheck),
    File(String, FileCheck),
    Http(String, HttpCheck),
    Addr(String, AddrCheck),
}

impl Check {
    /// Flattens a check-set into runnable checks, in a stable order.
    pub fn all(gossfile: &Gossfile) -> Vec<Check> {
        let commands = gossfile
            .command
            .iter()
            .map(|(id, c)| Check::Command(id.clone(), c.clone()));
        let files = gossfile
            .file
            .iter()
            .map(|(id, c)| Check::File(id.clone(), c.clone()));
        let https = gossfile
            .http
            .iter()
            .map(|(id, c)| Check::Http(id.clone(), c.clone()));
        let addrs = gossfile
            .addr
            .iter()
            .map(|(id, c)| Check::Addr(id.clone(), c.clone()));

        commands.chain(files).chain(https).chain(addrs).collect()
    }

    pub async fn run(&self, sys: &System) -> OutcomeGroup {
        let group = match self {
            Check::Command(cmd, check) => run_command(cmd, check).await,
            Check::File(path, check) => run_file(path, check).await,
            Check::Http(url, check) => run_http(sys, url, check).await,
            Check::Addr(addr, check) => run_addr(addr, check).await,
        };
        debug!(
            results = group.len(),
            failed = group.iter().filter(|r| !r.successful).count(),
            "check finished"
        );
        group
    }

    /// Like [`Check::run`], but a panic inside the check is reported as a
    /// failed result for this resource.
    pub async fn run_guarded(&self, sys: &System) -> OutcomeGroup {
        guarded(self, self.run(sys)).await
    }

    fn failure(&self, reason: impl ToString) -> OutcomeGroup {
        let (kind, id, property, title) = match self {
            Check::Command(cmd, c) => ("command", cmd, "exit-status", &c.title),
            Check::File(path, c) => ("file", path, "exists", &c.title),
            Check::Http(url, c) => ("http", url, "status", &c.title),
            Check::Addr(addr, c) => ("addr", addr, "reachable", &c.title),
        };
        vec![TestResult::new(kind, id, property, title).error(reason)]
    }
}

async fn guarded<F>(check: &Check, run: F) -> OutcomeGroup
where
    F: Future<Output = OutcomeGroup>,
{
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(group) => group,
        Err(panic) => {
            let reason = format!("check panicked: {}", panic_message(panic.as_ref()));
            error!(reason = %reason, "check aborted");
            check.failure(reason)
        }
    }
}

async fn run_command(cmd: &str, check: &CommandCheck) -> OutcomeGroup {
    let start = Instant::now();
    let output = timeout(
        check.timeout(),
        Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await;
    let elapsed = start.elapsed();
    let base = |property: &str| {
        TestResult::new("command", cmd, property, &check.title).duration(elapsed)
    };

    let output = match output {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return vec![base("exit-status").error(e)],
        Err(_) => {
            return vec![base("exit-status").error(format!(
                "command timed out after {:?}",
                check.timeout()
            ))]
        }
    };

    let found = output.status.code().unwrap_or(-1);
    let mut group = vec![base("exit-status").compare(check.exit_status, found)];
    if !check.stdout.is_empty() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        group.push(base("stdout").contains_all(&check.stdout, &stdout));
    }
    group
}

async fn run_file(path: &str, check: &FileCheck) -> OutcomeGroup {
    let start = Instant::now();
    let exists = tokio::fs::metadata(path).await.is_ok();
    let mut group = vec![TestResult::new("file", path, "exists", &check.title)
        .duration(start.elapsed())
        .compare(check.exists, exists)];

    if exists && !check.contains.is_empty() {
        let result = TestResult::new("file", path, "contains", &check.title);
        group.push(match tokio::fs::read_to_string(path).await {
            Ok(contents) => result
                .duration(start.elapsed())
                .contains_all(&check.contains, &contents),
            Err(e) => result.duration(start.elapsed()).error(e),
        });
    }
    group
}

async fn run_http(sys: &System, url: &str, check: &HttpCheck) -> OutcomeGroup {
    let start = Instant::now();
    let response = sys
        .client()
        .get(url)
        .timeout(check.timeout())
        .send()
        .await;
    let base = |property: &str| {
        TestResult::new("http", url, property, &check.title).duration(start.elapsed())
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => return vec![base("status").error(e)],
    };

    let mut group = vec![base("status").compare(check.status, response.status().as_u16())];
    if !check.body.is_empty() {
        group.push(match response.text().await {
            Ok(body) => base("body").contains_all(&check.body, &body),
            Err(e) => base("body").error(e),
        });
    }
    group
}

async fn run_addr(addr: &str, check: &AddrCheck) -> OutcomeGroup {
    let start = Instant::now();
    let reachable = matches!(
        timeout(check.timeout(), TcpStream::connect(addr)).await,
        Ok(Ok(_))
    );

    vec![TestResult::new("addr", addr, "reachable", &check.title)
        .duration(start.elapsed())
        .compare(check.reachable, reachable)]
}
