use crate::controller::{PdfExport, PreviewSyncController, PreviewUpdate, SaveOutcome};
use crate::draft::{Field, FieldEvent, LabelDraft, PairSide};
use crate::surface::PreviewSurface;
use crate::transport::Transport;
use crate::{Error, PageBootstrap, Result, UploadedAsset};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Event(Field, FieldEvent, String, oneshot::Sender<Result<Option<PreviewUpdate>>>),
    Edit(Field, String, oneshot::Sender<Result<Option<PreviewUpdate>>>),
    Pair(Field, PairSide, FieldEvent, String, oneshot::Sender<Result<Option<PreviewUpdate>>>),
    Attach(UploadedAsset, oneshot::Sender<Result<PreviewUpdate>>),
    Submit(oneshot::Sender<Result<PreviewUpdate>>),
    ExportPdf(oneshot::Sender<Result<PdfExport>>),
    Save(oneshot::Sender<Result<SaveOutcome>>),
    Initialize(PageBootstrap, oneshot::Sender<Result<()>>),
    Draft(oneshot::Sender<LabelDraft>),
    Close(oneshot::Sender<()>),
}

/// An async-friendly label session backed by a dedicated worker thread.
///
/// The worker thread owns a synchronous `PreviewSyncController` and executes
/// commands in the order they were sent, so overlapping edits from async
/// tasks reach the backend one at a time and previews are applied in edit
/// order. Cloned handles share the same worker.
#[derive(Clone)]
pub struct LiveSession {
    cmd_tx: Sender<Command>,
}

impl LiveSession {
    /// Spawn a worker that builds its controller with `factory`.
    ///
    /// The controller is created on the worker thread, so neither the
    /// transport nor the surface has to be `Send`.
    pub async fn spawn<T, S, F>(factory: F) -> Result<Self>
    where
        T: Transport + 'static,
        S: PreviewSurface + 'static,
        F: FnOnce() -> Result<PreviewSyncController<T, S>> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let mut controller = match factory() {
                Ok(c) => c,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Event(field, event, value, resp) => {
                        let _ = resp.send(controller.handle_event(field, event, value));
                    }
                    Command::Edit(field, value, resp) => {
                        let _ = resp.send(controller.edit_field(field, value));
                    }
                    Command::Pair(field, side, event, value, resp) => {
                        let _ = resp.send(controller.sync_pair(field, side, event, value));
                    }
                    Command::Attach(asset, resp) => {
                        let _ = resp.send(controller.attach_background(asset));
                    }
                    Command::Submit(resp) => {
                        let _ = resp.send(controller.submit_draft());
                    }
                    Command::ExportPdf(resp) => {
                        let _ = resp.send(controller.export_pdf());
                    }
                    Command::Save(resp) => {
                        let _ = resp.send(controller.save_label());
                    }
                    Command::Initialize(boot, resp) => {
                        let _ = resp.send(controller.initialize(&boot));
                    }
                    Command::Draft(resp) => {
                        let _ = resp.send(controller.draft().clone());
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(());
                        break;
                    }
                }
            }
        });

        match init_rx.await {
            Ok(Ok(())) => Ok(Self { cmd_tx }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::InitializationError("session worker exited during startup".into())),
        }
    }

    /// Spawn a session talking HTTP to the configured backend
    #[cfg(feature = "http")]
    pub async fn connect<S>(config: crate::SyncConfig, surface: S) -> Result<Self>
    where
        S: PreviewSurface + Send + 'static,
    {
        Self::spawn(move || crate::connect(config, surface)).await
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| Error::Other("session worker has stopped".into()))?;
        rx.await
            .map_err(|_| Error::Other("session worker dropped the reply".into()))
    }

    pub async fn handle_event(
        &self,
        field: Field,
        event: FieldEvent,
        value: impl Into<String>,
    ) -> Result<Option<PreviewUpdate>> {
        let value = value.into();
        self.request(|tx| Command::Event(field, event, value, tx)).await?
    }

    pub async fn edit(&self, field: Field, value: impl Into<String>) -> Result<Option<PreviewUpdate>> {
        let value = value.into();
        self.request(|tx| Command::Edit(field, value, tx)).await?
    }

    pub async fn sync_pair(
        &self,
        field: Field,
        side: PairSide,
        event: FieldEvent,
        value: impl Into<String>,
    ) -> Result<Option<PreviewUpdate>> {
        let value = value.into();
        self.request(|tx| Command::Pair(field, side, event, value, tx)).await?
    }

    pub async fn attach_background(&self, asset: UploadedAsset) -> Result<PreviewUpdate> {
        self.request(|tx| Command::Attach(asset, tx)).await?
    }

    pub async fn submit(&self) -> Result<PreviewUpdate> {
        self.request(Command::Submit).await?
    }

    pub async fn export_pdf(&self) -> Result<PdfExport> {
        self.request(Command::ExportPdf).await?
    }

    pub async fn save(&self) -> Result<SaveOutcome> {
        self.request(Command::Save).await?
    }

    pub async fn initialize(&self, boot: PageBootstrap) -> Result<()> {
        self.request(|tx| Command::Initialize(boot, tx)).await?
    }

    /// Snapshot of the worker's current draft
    pub async fn draft(&self) -> Result<LabelDraft> {
        self.request(Command::Draft).await
    }

    /// Stop the worker. Other clones of this handle stop working too.
    pub async fn close(self) -> Result<()> {
        self.request(Command::Close).await
    }
}
