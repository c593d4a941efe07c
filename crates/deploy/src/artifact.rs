//! Compiled contract artifacts.
//!
//! Contracts are compiled ahead of time into one JSON artifact per contract
//! (`<build dir>/<ContractName>.json`), carrying the contract ABI and its creation bytecode.

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::Scalar;

/// The default build directory holding contract artifacts.
pub const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

/// A compiled contract: ABI and creation bytecode.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    contract_name: String,
    abi: JsonAbi,
    bytecode: String,
}

impl ContractArtifact {
    /// Parse an artifact from its JSON content.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ArtifactFile =
            serde_json::from_str(content).context("Failed to parse contract artifact JSON")?;

        let bytecode = decode_bytecode(&file.contract_name, &file.bytecode)?;

        Ok(Self {
            contract_name: file.contract_name,
            abi: file.abi,
            bytecode,
        })
    }

    /// The deployment payload: creation bytecode followed by the ABI-encoded constructor
    /// arguments.
    pub fn deploy_data(&self, args: &[Scalar]) -> Result<Bytes> {
        let Some(constructor) = &self.abi.constructor else {
            if !args.is_empty() {
                anyhow::bail!(
                    "{} has no constructor but {} argument(s) were given",
                    self.contract_name,
                    args.len()
                );
            }
            return Ok(self.bytecode.clone());
        };

        let values = coerce_args(&self.contract_name, "constructor", &constructor.inputs, args)?;
        let encoded = constructor
            .abi_encode_input(&values)
            .with_context(|| format!("Failed to encode {} constructor arguments", self.contract_name))?;

        let mut data = self.bytecode.to_vec();
        data.extend_from_slice(&encoded);
        Ok(data.into())
    }

    /// Calldata for a call to `function`: selector followed by the encoded arguments.
    ///
    /// Overloads are resolved by arity.
    pub fn call_data(&self, function: &str, args: &[Scalar]) -> Result<Bytes> {
        let candidates = self
            .abi
            .function(function)
            .with_context(|| format!("{} has no function `{}`", self.contract_name, function))?;

        let function_abi = candidates
            .iter()
            .find(|f| f.inputs.len() == args.len())
            .with_context(|| {
                format!(
                    "{} has no `{}` overload taking {} argument(s)",
                    self.contract_name,
                    function,
                    args.len()
                )
            })?;

        let values = coerce_args(&self.contract_name, function, &function_abi.inputs, args)?;
        let encoded = function_abi
            .abi_encode_input(&values)
            .with_context(|| format!("Failed to encode {}.{} call", self.contract_name, function))?;

        Ok(encoded.into())
    }
}

/// Coerce configuration values into the parameter types declared by the ABI.
fn coerce_args(
    contract: &str,
    target: &str,
    inputs: &[Param],
    args: &[Scalar],
) -> Result<Vec<DynSolValue>> {
    if inputs.len() != args.len() {
        anyhow::bail!(
            "{}.{} expects {} argument(s), got {}",
            contract,
            target,
            inputs.len(),
            args.len()
        );
    }

    inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty: DynSolType = param
                .resolve()
                .with_context(|| format!("Unsupported ABI type `{}` in {}.{}", param.ty, contract, target))?;
            if matches!(ty, DynSolType::Int(_) | DynSolType::Uint(_)) && !arg.is_integral() {
                anyhow::bail!(
                    "Value {} is not an integer but parameter `{}` of {}.{} is `{}`",
                    arg,
                    param.name,
                    contract,
                    target,
                    param.ty
                );
            }
            ty.coerce_str(&arg.to_string()).with_context(|| {
                format!(
                    "Value {} cannot be encoded as `{}` for parameter `{}` of {}.{}",
                    arg, param.ty, param.name, contract, target
                )
            })
        })
        .collect()
}

fn decode_bytecode(contract: &str, bytecode: &str) -> Result<Bytes> {
    let hex_body = bytecode.strip_prefix("0x").unwrap_or(bytecode);

    if hex_body.is_empty() {
        anyhow::bail!(
            "{} has no bytecode (abstract contract or interface?)",
            contract
        );
    }

    if hex_body.contains("__") {
        anyhow::bail!(
            "{} bytecode contains unlinked library placeholders; link the libraries first",
            contract
        );
    }

    let bytes = hex::decode(hex_body)
        .with_context(|| format!("{} bytecode is not valid hex", contract))?;
    Ok(bytes.into())
}

/// Loads contract artifacts from a build directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The artifact path for a contract.
    pub fn path_for(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{contract}.json"))
    }

    /// Load the artifact of a contract by name.
    pub fn load(&self, contract: &str) -> Result<ContractArtifact> {
        let path = self.path_for(contract);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;

        let artifact = ContractArtifact::from_json_str(&content)
            .with_context(|| format!("Invalid artifact {}", path.display()))?;

        if artifact.contract_name != contract {
            anyhow::bail!(
                "Artifact {} describes contract {}, expected {}",
                path.display(),
                artifact.contract_name,
                contract
            );
        }

        tracing::debug!(
            contract = %contract,
            path = %path.display(),
            bytecode_len = artifact.bytecode.len(),
            "Artifact loaded"
        );

        Ok(artifact)
    }
}
