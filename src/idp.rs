//! The in-memory IdP and its server lifecycle.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

use crate::{
    config::{BuildError, IdpConfig, IdpConfigBuilder},
    routes::build_app,
    saml::{MetadataBuilder, SerializationError, XmlCodec},
};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IdpConfig>,
    pub codec: Arc<XmlCodec>,
}

impl AppState {
    pub fn new(config: IdpConfig, codec: XmlCodec) -> Self {
        Self {
            config: Arc::new(config),
            codec: Arc::new(codec),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A SAML 2.0 identity provider that answers every AuthnRequest with a
/// fixed response.
///
/// ```no_run
/// # async fn run() -> Result<(), in_memory_idp::IdpError> {
/// let mut idp = in_memory_idp::InMemoryIdp::builder()
///     .entity_id("https://idp.test")
///     .port(8080)
///     .build()?;
/// idp.start().await?;
///
/// let metadata = idp.metadata().expect("metadata");
/// # let _ = metadata;
/// idp.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct InMemoryIdp {
    state: AppState,
    host: IpAddr,
    server: Option<RunningServer>,
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl InMemoryIdp {
    pub fn builder() -> InMemoryIdpBuilder {
        InMemoryIdpBuilder::default()
    }

    pub fn config(&self) -> &IdpConfig {
        &self.state.config
    }

    /// Serialized `EntityDescriptor` for this IdP.
    ///
    /// Independent of whether the server is running.
    pub fn metadata(&self) -> Result<String, SerializationError> {
        MetadataBuilder::new(&self.state.codec).build(&self.state.config)
    }

    /// Bind the listener and serve in a background task.
    ///
    /// Does nothing if already running. On a bind failure the instance is
    /// left stopped and can be started again.
    pub async fn start(&mut self) -> Result<&mut Self, IdpError> {
        if self.server.is_some() {
            return Ok(self);
        }

        let addr = SocketAddr::new(self.host, self.state.config.port());
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| IdpError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = build_app(self.state.clone());
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(
            address = %local_addr,
            entity_id = %self.state.config.entity_id(),
            "In-memory IdP listening"
        );

        self.server = Some(RunningServer {
            local_addr,
            shutdown: Some(shutdown_tx),
            task,
        });
        Ok(self)
    }

    /// Shut the server down and wait until the socket is released.
    ///
    /// Safe to call when not running.
    pub async fn stop(&mut self) {
        let Some(mut server) = self.server.take() else {
            return;
        };

        if let Some(shutdown) = server.shutdown.take() {
            let _ = shutdown.send(());
        }

        match server.task.await {
            Ok(Ok(())) => tracing::info!(address = %server.local_addr, "In-memory IdP stopped"),
            Ok(Err(error)) => tracing::warn!(error = %error, "In-memory IdP server failed"),
            Err(error) => tracing::warn!(error = %error, "In-memory IdP server task panicked"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.server.is_some()
    }

    /// Address the listener is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|server| server.local_addr)
    }
}

impl Drop for InMemoryIdp {
    fn drop(&mut self) {
        if let Some(shutdown) = self
            .server
            .as_mut()
            .and_then(|server| server.shutdown.take())
        {
            let _ = shutdown.send(());
        }
    }
}

/// Builder for [`InMemoryIdp`].
#[derive(Clone)]
pub struct InMemoryIdpBuilder {
    config: IdpConfigBuilder,
    host: IpAddr,
    codec: Option<XmlCodec>,
}

impl Default for InMemoryIdpBuilder {
    fn default() -> Self {
        Self {
            config: IdpConfigBuilder::default(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            codec: None,
        }
    }
}

impl InMemoryIdpBuilder {
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.config = self.config.entity_id(entity_id);
        self
    }

    /// Port to listen on and to advertise. `0` binds an ephemeral port, but
    /// metadata keeps advertising `0`.
    pub fn port(mut self, port: u16) -> Self {
        self.config = self.config.port(port);
        self
    }

    pub fn signing_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.config = self.config.signing_certificate(certificate);
        self
    }

    pub fn saml_response_xml(mut self, xml: impl Into<String>) -> Self {
        self.config = self.config.saml_response_xml(xml);
        self
    }

    /// Address to bind. Defaults to `127.0.0.1`.
    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Replace the fully registered default codec.
    pub fn codec(mut self, codec: XmlCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> Result<InMemoryIdp, BuildError> {
        let codec = self.codec.unwrap_or_default();
        let config = self.config.build(&codec)?;

        tracing::debug!(
            entity_id = %config.entity_id(),
            port = config.port(),
            "Built in-memory IdP"
        );

        Ok(InMemoryIdp {
            state: AppState::new(config, codec),
            host: self.host,
            server: None,
        })
    }
}
