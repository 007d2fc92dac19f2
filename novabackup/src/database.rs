//! SQLite access for launcher database images
//!
//! All connections live on one dedicated worker thread. Callers talk to it
//! through a request queue and get each answer on a oneshot channel, so the
//! worker runs exactly one query at a time and replies can never be crossed.

use std::collections::HashMap;
use std::io::Write;
use std::time::Instant;

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("not a readable database image: {0}")]
    Open(#[source] rusqlite::Error),
    #[error("SQLite error: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no open database with handle {0}")]
    UnknownHandle(u64),
    #[error("query engine stopped")]
    EngineStopped,
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// The fixed queries a launcher database answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedQuery {
    AllApps,
    AllFavorites,
}

impl FixedQuery {
    pub fn sql(self) -> &'static str {
        match self {
            FixedQuery::AllApps => "SELECT _id, componentName, title, icon FROM allapps",
            FixedQuery::AllFavorites => {
                r#"SELECT favorites.*,
                          IFNULL(workspaceScreens.screenRank, -1) AS screenRank
                   FROM favorites
                   LEFT JOIN workspaceScreens
                       ON favorites.screen = workspaceScreens._id"#
            }
        }
    }
}

/// Column names plus raw rows, in result order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Map every row into a record with `f(columns, row)`.
    pub fn map_rows<T>(&self, f: impl Fn(&[String], &[Value]) -> T) -> Vec<T> {
        self.rows.iter().map(|row| f(&self.columns, row)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

enum Request {
    Open {
        image: Vec<u8>,
        reply: oneshot::Sender<DatabaseResult<u64>>,
    },
    Query {
        handle: u64,
        query: FixedQuery,
        reply: oneshot::Sender<DatabaseResult<QueryResult>>,
    },
    Close {
        handle: u64,
    },
}

/// Handle to the query worker. Cloning shares the same worker thread;
/// the thread exits once every handle is gone.
#[derive(Clone)]
pub struct QueryEngine {
    requests: mpsc::UnboundedSender<Request>,
}

impl QueryEngine {
    /// Start the worker thread.
    pub fn start() -> DatabaseResult<Self> {
        let (requests, inbox) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("novabackup-sqlite".to_string())
            .spawn(move || Worker::default().run(inbox))?;
        tracing::debug!(sqlite = rusqlite::version(), "query engine started");
        Ok(Self { requests })
    }

    /// Open a database image. The bytes are copied into a private temporary
    /// file that lives until the returned handle is dropped.
    pub async fn open(&self, image: Vec<u8>) -> DatabaseResult<DatabaseHandle> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Open { image, reply })?;
        let id = response.await.map_err(|_| DatabaseError::EngineStopped)??;
        Ok(DatabaseHandle { id, engine: self.clone() })
    }

    fn send(&self, request: Request) -> DatabaseResult<()> {
        self.requests.send(request).map_err(|_| DatabaseError::EngineStopped)
    }
}

/// An open database inside the worker
pub struct DatabaseHandle {
    id: u64,
    engine: QueryEngine,
}

impl DatabaseHandle {
    pub async fn all_apps(&self) -> DatabaseResult<QueryResult> {
        self.run(FixedQuery::AllApps).await
    }

    /// Every favorite with its screen's rank (-1 when the screen row is missing)
    pub async fn all_favorites(&self) -> DatabaseResult<QueryResult> {
        self.run(FixedQuery::AllFavorites).await
    }

    async fn run(&self, query: FixedQuery) -> DatabaseResult<QueryResult> {
        let (reply, response) = oneshot::channel();
        self.engine.send(Request::Query { handle: self.id, query, reply })?;
        response.await.map_err(|_| DatabaseError::EngineStopped)?
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        // Worker may already be gone at shutdown
        let _ = self.engine.send(Request::Close { handle: self.id });
    }
}

struct OpenDatabase {
    conn: Connection,
    // Backing file must outlive the connection
    _file: NamedTempFile,
}

#[derive(Default)]
struct Worker {
    next_id: u64,
    open: HashMap<u64, OpenDatabase>,
}

impl Worker {
    fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Request>) {
        while let Some(request) = inbox.blocking_recv() {
            match request {
                Request::Open { image, reply } => {
                    let _ = reply.send(self.open(image));
                }
                Request::Query { handle, query, reply } => {
                    let result = match self.open.get(&handle) {
                        Some(db) => Self::execute(&db.conn, query),
                        None => Err(DatabaseError::UnknownHandle(handle)),
                    };
                    let _ = reply.send(result);
                }
                Request::Close { handle } => {
                    self.open.remove(&handle);
                }
            }
        }
        tracing::debug!("query engine stopped");
    }

    fn open(&mut self, image: Vec<u8>) -> DatabaseResult<u64> {
        let started = Instant::now();
        let mut file = NamedTempFile::new()?;
        file.write_all(&image)?;
        file.flush()?;

        let conn = Connection::open_with_flags(
            file.path(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(DatabaseError::Open)?;

        // Opening is lazy; reading the schema is what rejects non-databases
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))
            .map_err(DatabaseError::Open)?;

        self.next_id += 1;
        let id = self.next_id;
        self.open.insert(id, OpenDatabase { conn, _file: file });
        tracing::debug!(
            handle = id,
            tables,
            bytes = image.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "opened launcher database"
        );
        Ok(id)
    }

    fn execute(conn: &Connection, query: FixedQuery) -> DatabaseResult<QueryResult> {
        let started = Instant::now();
        let mut stmt = conn.prepare(query.sql())?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let values = (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }

        tracing::debug!(
            ?query,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "query finished"
        );
        Ok(QueryResult { columns, rows })
    }
}
