use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{AppError, AppResult, DispatchError};
use crate::execution::instruction::{Ledger, LedgerInstruction};
use crate::wallet::rpc::parse_quantity;
use crate::wallet::{BitcoinWallet, EthereumWallet, TxReceipt};

/// LedgerDispatcher - hands a decoded instruction to the one wallet
/// operation that executes it
///
/// No retries here: a failure is returned as-is and the orchestrator
/// decides whether the instruction is tried again.
pub struct LedgerDispatcher {
    bitcoin: Arc<dyn BitcoinWallet>,
    ethereum: Arc<dyn EthereumWallet>,
}

impl LedgerDispatcher {
    pub fn new(bitcoin: Arc<dyn BitcoinWallet>, ethereum: Arc<dyn EthereumWallet>) -> Self {
        Self { bitcoin, ethereum }
    }

    #[instrument(skip(self, instruction), fields(ledger = %instruction.ledger(), kind = instruction.kind()))]
    pub async fn dispatch(&self, instruction: &LedgerInstruction) -> AppResult<TxReceipt> {
        let receipt = match instruction {
            LedgerInstruction::SendAmountToAddress {
                to,
                amount,
                network,
                ..
            } => {
                Self::ensure_network(Ledger::Bitcoin, network, self.bitcoin.network())?;
                let sats = parse_sats(amount)?;

                self.bitcoin
                    .send_to_address(to, sats, network)
                    .await
                    .map_err(|e| wallet_failed(Ledger::Bitcoin, e))?
            }
            LedgerInstruction::BroadcastSignedTransaction { hex, network, .. } => {
                Self::ensure_network(Ledger::Bitcoin, network, self.bitcoin.network())?;

                self.bitcoin
                    .broadcast_transaction(hex, network)
                    .await
                    .map_err(|e| wallet_failed(Ledger::Bitcoin, e))?
            }
            LedgerInstruction::DeployContract {
                data,
                amount,
                gas_limit,
                ..
            } => {
                let value = parse_quantity(amount)
                    .ok_or_else(|| DispatchError::InvalidAmount(amount.clone()))?;
                let gas = parse_gas_limit(gas_limit)?;

                self.ethereum
                    .deploy_contract(data, value, gas)
                    .await
                    .map_err(|e| wallet_failed(Ledger::Ethereum, e))?
            }
            LedgerInstruction::CallContract {
                contract_address,
                data,
                gas_limit,
                ..
            } => {
                let gas = parse_gas_limit(gas_limit)?;

                self.ethereum
                    .call_contract(data, contract_address, gas)
                    .await
                    .map_err(|e| wallet_failed(Ledger::Ethereum, e))?
            }
        };

        debug!("{} {} response: {:?}", instruction.ledger(), instruction.kind(), receipt);
        info!("✓ {} transaction submitted: {}", receipt.ledger, receipt.tx_id);

        Ok(receipt)
    }

    /// A misdirected instruction must never reach the signer
    fn ensure_network(ledger: Ledger, instruction: &str, wallet: &str) -> AppResult<()> {
        if instruction != wallet {
            return Err(DispatchError::NetworkMismatch {
                ledger: ledger.to_string(),
                instruction: instruction.to_string(),
                wallet: wallet.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn parse_sats(amount: &str) -> AppResult<u64> {
    match amount.trim().parse::<u64>() {
        Ok(sats) if sats > 0 => Ok(sats),
        _ => Err(DispatchError::InvalidAmount(amount.to_string()).into()),
    }
}

fn parse_gas_limit(gas_limit: &str) -> AppResult<u64> {
    parse_quantity(gas_limit)
        .and_then(|gas| u64::try_from(gas).ok())
        .ok_or_else(|| DispatchError::InvalidGasLimit(gas_limit.to_string()).into())
}

fn wallet_failed(ledger: Ledger, error: AppError) -> AppError {
    match error {
        AppError::Dispatch(_) => error,
        other => DispatchError::WalletFailed {
            ledger: ledger.to_string(),
            message: other.to_string(),
        }
        .into(),
    }
}
