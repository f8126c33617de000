//! Building, submitting and confirming transactions
//!
//! - `contracts`: contract metadata loading and the ABI encoder seam
//! - `abi`: decoding of words emitted in receipt logs
//! - `nonce`: next-nonce tracking per sender
//! - `receipt`: receipt polling
//! - `pipeline`: the staged build/submit/confirm flow

pub mod abi;
pub mod contracts;
pub mod nonce;
pub mod pipeline;
pub mod receipt;

pub use contracts::{AbiEncoder, ContractInterface, ContractRegistry, DirectoryContracts, StaticContracts};
pub use nonce::NonceSequencer;
pub use pipeline::{
    IdentityCreation, PendingTransaction, PipelineRun, PipelineStage, SubmitMode, TransactionPipeline,
    TransactionRequest,
};
pub use receipt::{PollPolicy, ReceiptPoller};
