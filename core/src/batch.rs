//! Batch front doors: resolve the key, build the transform, run the pool.

use std::sync::Arc;

use tracing::info;

use crate::config::BatchPlan;
use crate::crypto::key_fingerprint;
use crate::executor::{execute_in_parallel, ExecutionContext};
use crate::keystore::KeyStore;
use crate::result::ExecutionResult;
use crate::transform::{Decryptor, Encryptor, Logged, Operation};
use crate::types::BatchError;

/// Encrypt every task in `plan` for the public key stored under `alias`.
///
/// Key lookup failure, configuration errors, and two sources claiming one
/// output abort before any file is touched. Per-file failures are reported in the returned result.
pub fn encrypt_files(
    plan: &BatchPlan,
    keystore: &dyn KeyStore,
    alias: &str,
    ctx: &ExecutionContext,
) -> Result<ExecutionResult, BatchError> {
    ctx.config.validate()?;
    plan.check_destinations()?;
    let public_key = keystore.public_key(alias)?;
    info!(alias, fingerprint = %key_fingerprint(&public_key), files = plan.len(), "public key loaded");

    let transform = Logged::new(Encryptor::from_config(public_key, &ctx.config), Operation::Encrypt)
        .with_sink(ctx.events.clone());
    let result = execute_in_parallel(plan.tasks().to_vec(), Arc::new(transform), Operation::Encrypt, ctx)?;
    result.log_summary(Operation::Encrypt);
    Ok(result)
}

/// Decrypt every task in `plan` with the private key stored under `alias`.
pub fn decrypt_files(
    plan: &BatchPlan,
    keystore: &dyn KeyStore,
    alias: &str,
    ctx: &ExecutionContext,
) -> Result<ExecutionResult, BatchError> {
    ctx.config.validate()?;
    plan.check_destinations()?;
    let private_key = keystore.private_key(alias)?;
    info!(alias, files = plan.len(), "private key loaded");

    let transform = Logged::new(Decryptor::from_config(private_key, &ctx.config), Operation::Decrypt)
        .with_sink(ctx.events.clone());
    let result = execute_in_parallel(plan.tasks().to_vec(), Arc::new(transform), Operation::Decrypt, ctx)?;
    result.log_summary(Operation::Decrypt);
    Ok(result)
}
