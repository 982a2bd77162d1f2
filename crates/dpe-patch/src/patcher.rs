//! Patcher trait

use crate::error::PatchError;
use crate::report::Patched;
use dpe_artifact::{DocumentFlavor, PayloadMode, WireOperation};
use std::fmt::Debug;

/// Document type edited by a patcher
pub type DocumentOf<P> = <<P as Patcher>::Flavor as DocumentFlavor>::Document;

/// Operation type accepted by a patcher
pub type OperationOf<P> = <<P as Patcher>::Flavor as DocumentFlavor>::Operation;

/// Applies typed operations to one document flavor
///
/// # Contract
/// - `apply` is pure: no I/O, no shared state, deterministic
/// - Operations are applied strictly in order, later ones see earlier effects
/// - On error nothing is returned; the caller keeps its previous document
pub trait Patcher: Send + Sync + Debug {
    /// Flavor this patcher edits
    type Flavor: DocumentFlavor;

    /// Apply `ops` to `previous` (or to an empty document)
    ///
    /// # Errors
    /// Returns the first error that aborts the batch
    fn apply(
        &self,
        previous: Option<&DocumentOf<Self>>,
        ops: &[OperationOf<Self>],
    ) -> Result<Patched<DocumentOf<Self>>, PatchError>;

    /// How string payloads are treated when decoding
    fn payload_mode(&self) -> PayloadMode {
        PayloadMode::Normalize
    }

    /// Decode a batch of wire operations
    ///
    /// # Errors
    /// Returns [`PatchError::Decode`] for the first operation that does not
    /// fit this flavor
    fn decode(&self, wire: &[WireOperation]) -> Result<Vec<OperationOf<Self>>, PatchError> {
        let mode = self.payload_mode();
        wire.iter()
            .enumerate()
            .map(|(index, op)| {
                <Self::Flavor as DocumentFlavor>::decode(op, mode)
                    .map_err(|source| PatchError::Decode { index, source })
            })
            .collect()
    }

    /// Decode then apply
    ///
    /// # Errors
    /// Returns error if decoding or applying fails
    fn apply_wire(
        &self,
        previous: Option<&DocumentOf<Self>>,
        wire: &[WireOperation],
    ) -> Result<Patched<DocumentOf<Self>>, PatchError> {
        let ops = self.decode(wire)?;
        self.apply(previous, &ops)
    }
}
