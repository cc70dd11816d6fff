use crate::{
    descriptor::Descriptor,
    directory::Directory,
    factory::{Attribute, Factory},
    header::{data_name, Header},
    report::{Event, Reporter},
    Error,
};
use commonware_runtime::{Clock, Metrics, Storage};
use prometheus_client::metrics::counter::Counter;
use tracing::debug;

/// Configuration for an [Initializer].
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the document sub-database owning the attribute (only used for reporting).
    pub sub_db: String,

    /// Descriptor the recovered attribute must have.
    pub descriptor: Descriptor,

    /// Serial number of the write-ahead log the caller will replay from.
    pub current: u64,
}

/// Result of a successful [Initializer::init].
#[derive(Debug)]
pub enum Outcome<A> {
    /// Persisted data was loaded and committed at the serial number it was flushed at.
    Loaded(A),

    /// Persisted data was discarded (too new or of the wrong type). The empty attribute is
    /// committed at the serial number of the discarded flush, so replay starts from there.
    Reset(A),

    /// Nothing usable was persisted. The empty attribute is not committed.
    Created(A),
}

impl<A> Outcome<A> {
    /// The recovered attribute.
    pub fn attribute(&self) -> &A {
        match self {
            Self::Loaded(attribute) | Self::Reset(attribute) | Self::Created(attribute) => {
                attribute
            }
        }
    }

    /// Consume the outcome, returning the recovered attribute.
    pub fn into_inner(self) -> A {
        match self {
            Self::Loaded(attribute) | Self::Reset(attribute) | Self::Created(attribute) => {
                attribute
            }
        }
    }
}

/// Recovers one attribute from its [Directory].
pub struct Initializer<E: Storage + Clock + Metrics, D: Directory, F: Factory, R: Reporter> {
    context: E,
    directory: D,
    factory: F,
    reporter: R,
    cfg: Config,

    loaded: Counter,
    reset: Counter,
    created: Counter,
    failed: Counter,
}

impl<E: Storage + Clock + Metrics, D: Directory, F: Factory, R: Reporter> Initializer<E, D, F, R> {
    /// Create a new [Initializer].
    ///
    /// Fails if the configured descriptor is inconsistent.
    pub fn new(
        context: E,
        directory: D,
        factory: F,
        reporter: R,
        cfg: Config,
    ) -> Result<Self, Error> {
        cfg.descriptor.validate()?;

        // Initialize metrics
        let loaded = Counter::default();
        let reset = Counter::default();
        let created = Counter::default();
        let failed = Counter::default();
        context.register(
            "loaded",
            "Number of attributes loaded from storage",
            loaded.clone(),
        );
        context.register(
            "reset",
            "Number of persisted attributes discarded for empty ones",
            reset.clone(),
        );
        context.register(
            "created",
            "Number of empty attributes created without persisted data",
            created.clone(),
        );
        context.register(
            "failed",
            "Number of attributes that could not be recovered",
            failed.clone(),
        );

        Ok(Self {
            context,
            directory,
            factory,
            reporter,
            cfg,
            loaded,
            reset,
            created,
            failed,
        })
    }

    /// Recover the attribute.
    ///
    /// Persisted data is only loaded if it was created at or before the current serial number
    /// and its descriptor is accepted. Otherwise an empty attribute is returned. If data that
    /// passed both checks cannot be loaded (or its header cannot be read), an error is returned
    /// instead of an empty attribute.
    pub async fn init(&self) -> Result<Outcome<F::Attribute>, Error> {
        let outcome = if self.directory.is_empty() {
            Ok(self.create_empty())
        } else {
            self.try_load().await
        };
        match &outcome {
            Ok(Outcome::Loaded(_)) => self.loaded.inc(),
            Ok(Outcome::Reset(_)) => self.reset.inc(),
            Ok(Outcome::Created(_)) => self.created.inc(),
            Err(_) => self.failed.inc(),
        };
        outcome
    }

    async fn try_load(&self) -> Result<Outcome<F::Attribute>, Error> {
        let serial = self.directory.flushed_serial();
        let file = self.directory.file_name(serial);
        let mut attribute = self.factory.create(&file, &self.cfg.descriptor);
        if serial == 0 {
            debug!(%file, "flushed generation is empty");
            self.factory.setup_empty(&mut attribute, self.cfg.current);
            return Ok(Outcome::Created(attribute));
        }

        let (blob, len) = self
            .context
            .open(self.directory.partition(), data_name(&file).as_bytes())
            .await?;
        let header = Header::read(&blob, len).await?;
        if header.created > self.cfg.current || !attribute.descriptor().accepts(&header.descriptor)
        {
            self.setup_empty(&mut attribute, serial, &header);
            return Ok(Outcome::Reset(attribute));
        }
        self.load(&mut attribute, serial)?;
        Ok(Outcome::Loaded(attribute))
    }

    fn load(&self, attribute: &mut F::Attribute, serial: u64) -> Result<(), Error> {
        assert!(attribute.can_load(), "attribute has no data to load");
        let start = self.context.current();
        self.reporter.report(Event::LoadStarted {
            sub_db: self.cfg.sub_db.clone(),
            attribute: attribute.name().to_string(),
        });
        if let Err(err) = attribute.load() {
            let file = attribute.base_file_name().to_string();
            let reason = err.to_string();
            self.reporter.report(Event::LoadFailed {
                file: file.clone(),
                reason: reason.clone(),
            });
            return Err(Error::Load { file, reason });
        }
        attribute.commit(serial, serial);
        let elapsed = self
            .context
            .current()
            .duration_since(start)
            .unwrap_or_default();
        self.reporter.report(Event::LoadCompleted {
            sub_db: self.cfg.sub_db.clone(),
            attribute: attribute.name().to_string(),
            elapsed,
        });
        Ok(())
    }

    fn setup_empty(&self, attribute: &mut F::Attribute, serial: u64, header: &Header) {
        // Report every reason, not just the first that applied
        let file = attribute.base_file_name().to_string();
        if header.created > self.cfg.current {
            self.reporter.report(Event::TooNew {
                file: file.clone(),
                created: header.created,
                current: self.cfg.current,
            });
        }
        if !attribute.descriptor().accepts(&header.descriptor) {
            self.reporter.report(Event::WrongType {
                file: file.clone(),
                expected: attribute.descriptor().clone(),
                actual: header.descriptor.clone(),
            });
        }
        self.reporter.report(Event::ReturningEmpty { file });
        self.factory.setup_empty(attribute, self.cfg.current);
        attribute.commit(serial, serial);
    }

    fn create_empty(&self) -> Outcome<F::Attribute> {
        let file = self.directory.file_name(0);
        let mut attribute = self.factory.create(&file, &self.cfg.descriptor);
        self.factory.setup_empty(&mut attribute, self.cfg.current);
        Outcome::Created(attribute)
    }
}
