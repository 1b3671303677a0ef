// One-shot swap from the payer's own token accounts

use anyhow::{Context, Result};
use auto_market::{
    scale_amount, AgentState, Asset, ClusterConfig, Direction, LedgerClient, OrderSubmitter,
    TokenProvisioner, TradeIntent,
};
use clap::Args;
use solana_sdk::signature::Signer;
use std::sync::Arc;

use super::{
    utils::{connect, info, load_payer, load_pool, success},
    GlobalArgs,
};

#[derive(Args)]
pub struct SwapCmd {
    /// Amount of token A to sell, in whole tokens
    #[arg(short = 'a', long, conflicts_with = "amount_b")]
    amount_a: Option<f64>,

    /// Amount of token B to sell, in whole tokens
    #[arg(short = 'b', long)]
    amount_b: Option<f64>,

    /// Decimals of both pool mints
    #[arg(long, default_value = "9")]
    decimals: u8,

    /// Minimum output as basis points of the input amount
    #[arg(long, default_value = "0")]
    min_output_bps: u16,
}

impl SwapCmd {
    fn intent(&self) -> Result<TradeIntent> {
        if self.min_output_bps > 10_000 {
            anyhow::bail!("--min-output-bps ({}) must be at most 10000", self.min_output_bps);
        }
        let (direction, tokens) = match (self.amount_a, self.amount_b) {
            (Some(a), _) if a > 0.0 => (Direction::AtoB, a),
            (_, Some(b)) if b > 0.0 => (Direction::BtoA, b),
            _ => anyhow::bail!("--amount-a or --amount-b must be given and positive"),
        };
        let amount = scale_amount(tokens, self.decimals)?;
        if amount == 0 {
            anyhow::bail!("Amount {} rounds to zero with {} decimals", tokens, self.decimals);
        }
        Ok(TradeIntent { direction, amount })
    }
}

pub async fn execute(cmd: SwapCmd, global: &GlobalArgs) -> Result<()> {
    let intent = cmd.intent()?;

    info("[1/4] Loading pool addresses...");
    let payer = load_payer(&global.payer)?;
    let pool = Arc::new(load_pool(global)?);
    let ledger = Arc::new(connect(global, &ClusterConfig::default(), payer.clone())?);
    info(&format!("Pool: {}", pool.pool));

    info("[2/4] Preparing token accounts...");
    let owner = payer.pubkey();
    let token_a = ledger
        .ensure_account(&owner, &pool.mint_a)
        .await
        .context("Failed to prepare token A account")?;
    let token_b = ledger
        .ensure_account(&owner, &pool.mint_b)
        .await
        .context("Failed to prepare token B account")?;

    let source = intent.direction.source();
    let source_account = if source == Asset::A { token_a } else { token_b };
    ledger
        .mint_to(&source_account, &pool.mint(source), intent.amount)
        .await
        .context("Failed to mint input tokens")?;
    info(&format!("Minted {} of {:?} to {}", intent.amount, source, source_account));

    let before_a = ledger.token_balance(&token_a).await?;
    let before_b = ledger.token_balance(&token_b).await?;
    info(&format!("Balances before: A {}, B {}", before_a, before_b));

    info(&format!("[3/4] Swapping {} {}...", intent.direction, intent.amount));
    let trader = AgentState::new("payer", payer.clone(), token_a, token_b, before_a, before_b);
    let submitter = OrderSubmitter::new(ledger.clone(), pool, payer, cmd.min_output_bps);
    let signature = submitter
        .submit(&trader, intent)
        .await
        .context("Swap failed")?;
    success(&format!("Swap confirmed: {}", signature));

    info("[4/4] Reading balances...");
    let after_a = ledger.token_balance(&token_a).await?;
    let after_b = ledger.token_balance(&token_b).await?;
    info(&format!("Balances after: A {}, B {}", after_a, after_b));
    info(&format!(
        "Change: A {:+}, B {:+}",
        after_a as i128 - before_a as i128,
        after_b as i128 - before_b as i128
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_cmd(amount_a: Option<f64>, amount_b: Option<f64>, min_output_bps: u16) -> SwapCmd {
        SwapCmd {
            amount_a,
            amount_b,
            decimals: 9,
            min_output_bps,
        }
    }

    #[test]
    fn test_min_output_bps_above_full_output_rejected() {
        assert!(swap_cmd(Some(1.0), None, 10_001).intent().is_err());
        assert!(swap_cmd(None, Some(1.0), u16::MAX).intent().is_err());

        let intent = swap_cmd(Some(1.0), None, 10_000).intent().unwrap();
        assert_eq!(intent.direction, Direction::AtoB);
        assert_eq!(intent.amount, 1_000_000_000);
    }

    #[test]
    fn test_amount_picks_direction() {
        let intent = swap_cmd(None, Some(0.5), 0).intent().unwrap();
        assert_eq!(intent.direction, Direction::BtoA);
        assert_eq!(intent.amount, 500_000_000);

        assert!(swap_cmd(None, None, 0).intent().is_err());
        assert!(swap_cmd(Some(1e-12), None, 0).intent().is_err());
    }
}
