use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fs4::fs_std::FileExt;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;

use crate::error::Error;

const DEFAULT_MUTEX_FILENAME: &str = ".pakt-mutex";
const DEFAULT_MUTEX_PORT: u16 = 31997;
const FILE_RETRY_INTERVAL: Duration = Duration::from_millis(200);
const LEADER_EXIT_GRACE: Duration = Duration::from_secs(5);

/// The `file[:path]` / `network[:port]` specifier a caller passes on the
/// command line, per spec.md §6.
#[derive(Clone, Debug)]
pub enum MutexSpec {
    File(PathBuf),
    Network(u16),
}

impl MutexSpec {
    pub fn parse(raw: &str, cwd: &Path) -> Result<MutexSpec, Error> {
        match raw {
            "file" => return Ok(MutexSpec::File(cwd.join(DEFAULT_MUTEX_FILENAME))),
            "network" => return Ok(MutexSpec::Network(DEFAULT_MUTEX_PORT)),
            _ => {}
        }

        if let Some(path) = raw.strip_prefix("file:") {
            return Ok(MutexSpec::File(PathBuf::from(path)));
        }

        if let Some(port) = raw.strip_prefix("network:") {
            let port: u16 = port.parse().map_err(|_| Error::InvalidMutexSpecifier(raw.to_string()))?;
            return Ok(MutexSpec::Network(port));
        }

        Err(Error::InvalidMutexSpecifier(raw.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct LeaderIdentity {
    cwd: String,
    pid: u32,
}

/// Runs `work` under the single-instance mutex `spec` describes, per
/// spec.md §4.K. Only one caller across the mutex's scope (a working
/// directory for file mode, a port for network mode) runs `work` at a
/// time; everyone else waits for the current leader to finish.
pub async fn with_mutex<F, Fut, T>(spec: &MutexSpec, cwd: &Path, work: F) -> Result<T, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    match spec {
        MutexSpec::File(path) => with_file_mutex(path, work).await,
        MutexSpec::Network(port) => with_network_mutex(*port, cwd, work).await,
    }
}

async fn with_file_mutex<F, Fut, T>(path: &Path, work: F) -> Result<T, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new().create(true).write(true).open(path)?;

    let mut warned = false;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => break,
            Err(_) => {
                if !warned {
                    log::warn!("waiting for instance (file mutex {})", path.display());
                    warned = true;
                }
                sleep(FILE_RETRY_INTERVAL).await;
            }
        }
    }

    let result = work().await;
    let _ = FileExt::unlock(&file);
    result
}

async fn with_network_mutex<F, Fut, T>(port: u16, cwd: &Path, work: F) -> Result<T, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    loop {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return run_as_leader(listener, cwd, work).await,
            Err(_) => {
                wait_for_leader_exit(port).await?;
            }
        }
    }
}

/// This process won the bind race: it becomes the leader, accepts (and
/// simply holds open) connections from waiting followers while `work`
/// runs, then shuts down and drops every accepted socket so followers'
/// connections close and they retry the bind.
async fn run_as_leader<F, Fut, T>(listener: TcpListener, cwd: &Path, work: F) -> Result<T, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let identity = Arc::new(LeaderIdentity { cwd: cwd.display().to_string(), pid: std::process::id() });
    let connection_tasks: Arc<AsyncMutex<Vec<tokio::task::JoinHandle<()>>>> = Arc::new(AsyncMutex::new(Vec::new()));

    let accept_identity = identity.clone();
    let accept_tasks = connection_tasks.clone();
    let accept_task = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };

            let io = TokioIo::new(stream);
            let identity = accept_identity.clone();

            let handle = tokio::spawn(async move {
                let service = service_fn(move |_req: Request<Incoming>| {
                    let identity = identity.clone();
                    async move {
                        let body = serde_json::to_vec(&*identity).unwrap_or_default();
                        Ok::<_, std::convert::Infallible>(Response::new(Full::new(Bytes::from(body))))
                    }
                });

                // Followers that merely connect-and-wait (the raw-TCP half
                // of the protocol) never send a request; this future stays
                // pending until we abort it on leader exit, at which point
                // dropping the task drops `io` and closes their socket.
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });

            accept_tasks.lock().await.push(handle);
        }
    });

    let result = work().await;

    accept_task.abort();

    // Destroying every accepted socket is what lets followers blocked on a
    // raw TCP read observe EOF and retry the bind race. `abort` only
    // requests cancellation — the handles stay in `connection_tasks` so the
    // grace-period loop below can actually observe whether they finished.
    {
        let tasks = connection_tasks.lock().await;
        for handle in tasks.iter() {
            handle.abort();
        }
    }

    let deadline = tokio::time::Instant::now() + LEADER_EXIT_GRACE;
    loop {
        let still_active: Vec<usize> = {
            let tasks = connection_tasks.lock().await;
            tasks.iter().enumerate().filter(|(_, h)| !h.is_finished()).map(|(i, _)| i).collect()
        };

        if still_active.is_empty() {
            break;
        }

        if tokio::time::Instant::now() >= deadline {
            log::error!("{} mutex socket(s) still active {LEADER_EXIT_GRACE:?} after leader exit: {still_active:?}", still_active.len());
            std::process::exit(1);
        }

        sleep(Duration::from_millis(50)).await;
    }

    result
}

/// This process lost the bind race: report the current leader, then block
/// on a raw TCP connection until it closes (the leader exited), at which
/// point the caller retries the bind.
async fn wait_for_leader_exit(port: u16) -> Result<(), Error> {
    let url = format!("http://127.0.0.1:{port}/");

    if let Ok(response) = reqwest::get(&url).await {
        if let Ok(identity) = response.json::<LeaderIdentity>().await {
            log::warn!("waiting for instance running in {} (pid {})", identity.cwd, identity.pid);
        }
    }

    if let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)).await {
        use tokio::io::AsyncReadExt;
        let mut buf = [0u8; 64];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    } else {
        sleep(FILE_RETRY_INTERVAL).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_specifiers() {
        let cwd = PathBuf::from("/tmp/project");
        assert!(matches!(MutexSpec::parse("file", &cwd), Ok(MutexSpec::File(_))));
        assert!(matches!(MutexSpec::parse("network", &cwd), Ok(MutexSpec::Network(DEFAULT_MUTEX_PORT))));
    }

    #[test]
    fn parses_explicit_path_and_port() {
        let cwd = PathBuf::from("/tmp/project");
        match MutexSpec::parse("file:/tmp/custom.lock", &cwd).unwrap() {
            MutexSpec::File(path) => assert_eq!(path, PathBuf::from("/tmp/custom.lock")),
            _ => panic!("expected file variant"),
        }

        match MutexSpec::parse("network:4242", &cwd).unwrap() {
            MutexSpec::Network(port) => assert_eq!(port, 4242),
            _ => panic!("expected network variant"),
        }
    }

    #[test]
    fn rejects_unrecognized_specifiers() {
        let cwd = PathBuf::from("/tmp/project");
        assert!(MutexSpec::parse("bogus", &cwd).is_err());
    }
}
