//! SQL connections over TDS
//!
//! Every data operation opens its own connection, does its work and closes
//! the connection again whether or not the work succeeded.

use std::fmt;
use std::time::Duration;

use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::{self, Profile};
use crate::error::{CoreError, Result};

pub type TdsClient = Client<Compat<TcpStream>>;

/// Default TDS port
pub const DEFAULT_PORT: u16 = 1433;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const APPLICATION_NAME: &str = concat!("azsqlctl/", env!("CARGO_PKG_VERSION"));

/// Everything needed to reach and log in to a database
#[derive(Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    password: String,
    pub database: String,
    pub connect_timeout: Duration,
    pub trust_server_certificate: bool,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

impl ConnectionSettings {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            trust_server_certificate: false,
        }
    }

    /// Settings for a profile's database, resolving the admin password
    pub fn from_profile(profile: &Profile) -> config::Result<Self> {
        Ok(Self::new(
            profile.server_fqdn(),
            &profile.admin_login,
            profile.resolve_admin_password()?,
            &profile.database,
        )
        .with_port(profile.port)
        .with_connect_timeout(profile.timeouts.connect_timeout())
        .with_trust_server_certificate(profile.trust_server_certificate))
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    /// Connection string in the `key=value;` form used by SQL Server drivers
    pub fn connection_string(&self) -> String {
        format!(
            "server={};user id={};password={};port={};database={};",
            self.host, self.user, self.password, self.port, self.database
        )
    }

    /// Connection string safe to log
    pub fn redacted_connection_string(&self) -> String {
        format!(
            "server={};user id={};password=***;port={};database={};",
            self.host, self.user, self.port, self.database
        )
    }

    fn tds_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.database(&self.database);
        config.application_name(APPLICATION_NAME);
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        config.encryption(EncryptionLevel::Required);
        if self.trust_server_certificate {
            config.trust_cert();
        }
        config
    }
}

/// An open, verified database connection
pub struct SqlConnection {
    client: TdsClient,
    database: String,
}

impl SqlConnection {
    /// Connect, log in and answer a ping, all within the connect timeout
    pub async fn open(settings: &ConnectionSettings) -> Result<Self> {
        let timeout = settings.connect_timeout;
        let connection = tokio::time::timeout(timeout, async {
            let mut connection = Self::establish(settings).await?;
            connection.ping().await?;
            Ok::<_, CoreError>(connection)
        })
        .await
        .map_err(|_| CoreError::ConnectTimeout(timeout))??;

        info!(
            host = %settings.host,
            database = %settings.database,
            "Connected"
        );
        Ok(connection)
    }

    async fn establish(settings: &ConnectionSettings) -> Result<Self> {
        let config = settings.tds_config();
        debug!(connection = %settings.redacted_connection_string(), "Opening connection");

        let tcp = tcp_connect(&config.get_addr()).await?;
        let client = match Client::connect(config.clone(), tcp.compat_write()).await {
            Ok(client) => client,
            // The gateway may hand us off to the node hosting the database
            Err(tiberius::error::Error::Routing { host, port }) => {
                debug!(host = %host, port = port, "Following gateway redirect");
                let mut config = config;
                config.host(&host);
                config.port(port);
                let tcp = tcp_connect(&config.get_addr()).await?;
                Client::connect(config, tcp.compat_write()).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            client,
            database: settings.database.clone(),
        })
    }

    /// Round-trip `SELECT 1`
    pub async fn ping(&mut self) -> Result<()> {
        let row = self
            .client
            .simple_query("SELECT 1")
            .await?
            .into_row()
            .await?;

        match row.and_then(|r| r.get::<i32, _>(0)) {
            Some(1) => Ok(()),
            other => Err(CoreError::Connect(format!(
                "unexpected ping response: {:?}",
                other
            ))),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub(crate) fn client(&mut self) -> &mut TdsClient {
        &mut self.client
    }

    /// Close the connection
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

async fn tcp_connect(addr: &str) -> Result<TcpStream> {
    let tcp = TcpStream::connect(addr)
        .await
        .map_err(|e| CoreError::Connect(format!("{}: {}", addr, e)))?;
    tcp.set_nodelay(true)
        .map_err(|e| CoreError::Connect(format!("{}: {}", addr, e)))?;
    Ok(tcp)
}

/// Open a connection and verify it with a ping
pub async fn connect(settings: &ConnectionSettings) -> Result<SqlConnection> {
    SqlConnection::open(settings).await
}

/// Close `connection` and hand back `outcome`
///
/// A close failure is logged and never replaces the outcome of the work done
/// on the connection.
pub(crate) async fn release<T>(connection: SqlConnection, outcome: Result<T>) -> Result<T> {
    if let Err(e) = connection.close().await {
        warn!(error = %e, "Failed to close connection");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConnectionSettings {
        ConnectionSettings::new("srv.database.windows.net", "sqladmin", "hunter2", "quickstart")
    }

    #[test]
    fn test_connection_string_format() {
        assert_eq!(
            settings().connection_string(),
            "server=srv.database.windows.net;user id=sqladmin;password=hunter2;port=1433;database=quickstart;"
        );
    }

    #[test]
    fn test_redaction() {
        let settings = settings();
        assert!(!settings.redacted_connection_string().contains("hunter2"));
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn test_tds_config_address() {
        let config = settings().with_port(11433).tds_config();
        assert_eq!(config.get_addr(), "srv.database.windows.net:11433");
    }

    #[tokio::test]
    async fn test_silent_server_times_out_within_one_bound() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept and hold the socket without ever answering the prelogin
        let held = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let timeout = Duration::from_millis(400);
        let settings = ConnectionSettings::new("127.0.0.1", "sa", "pw", "master")
            .with_port(port)
            .with_connect_timeout(timeout);

        let started = std::time::Instant::now();
        let err = connect(&settings).await.err().unwrap();
        let elapsed = started.elapsed();
        held.abort();

        assert!(matches!(err, CoreError::ConnectTimeout(t) if t == timeout));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout * 2, "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connect_error() {
        // Nothing listens on the discard port of localhost
        let settings = ConnectionSettings::new("127.0.0.1", "sa", "pw", "master")
            .with_port(9)
            .with_connect_timeout(Duration::from_secs(5));

        let err = connect(&settings).await.err().unwrap();
        assert!(matches!(
            err,
            CoreError::Connect(_) | CoreError::ConnectTimeout(_)
        ));
    }
}
