//! Reveal a committed juror vote

use crate::errors::JobMarketError;
use crate::events::JurorVoteRevealed;
use crate::state::{DisputeCase, Job, JobState, ProtocolConfig, HASH_SIZE};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct RevealJurorVote<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(
        seeds = [b"job", job.job_id.to_le_bytes().as_ref()],
        bump = job.bump
    )]
    pub job: Account<'info, Job>,

    #[account(
        mut,
        seeds = [b"case", job.key().as_ref()],
        bump = case.bump
    )]
    pub case: Box<Account<'info, DisputeCase>>,

    pub juror: Signer<'info>,
}

pub fn handler(
    ctx: Context<RevealJurorVote>,
    employer_wins: bool,
    salt: [u8; HASH_SIZE],
) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;
    let job = &ctx.accounts.job;
    require!(job.state == JobState::Disputed, JobMarketError::InvalidJobState);

    let juror = ctx.accounts.juror.key();
    let case = &mut ctx.accounts.case;
    case.reveal(&juror, employer_wins, &salt, clock.unix_timestamp)?;

    if case.all_revealed() {
        msg!("All {} jurors revealed for job {}", case.jurors.len(), job.job_id);
    }

    emit!(JurorVoteRevealed {
        job_id: job.job_id,
        juror,
        employer_wins,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
