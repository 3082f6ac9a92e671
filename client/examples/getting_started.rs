// KYC Crowdfund Client
// Copyright (C) 2019 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Getting started with a session by funding a campaign.
//!
//! A user gets verified by the registry admin, creates a campaign and a backer funds it. All of
//! this runs against the in-memory [backend::Emulator].

use kyc_crowdfund_client::backend::Emulator;
use kyc_crowdfund_client::*;

#[async_std::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let admin_address = Address::from_bytes([0xad; 20]);
    let creator_address = Address::from_bytes([0x11; 20]);
    let backer_address = Address::from_bytes([0x22; 20]);

    // Every clone of the emulator shares the same ledger.
    let emulator = Emulator::new(admin_address);
    emulator.fund(backer_address, 5_000);

    let admin = Session::new(emulator.clone(), Some(admin_address), Config::default());
    let creator = Session::new(emulator.clone(), Some(creator_address), Config::default());
    let backer = Session::new(emulator.clone(), Some(backer_address), Config::default());

    print!("Submitting KYC for {}... ", creator_address.short());
    creator.submit_kyc("Grace Hopper", "GH-1906").await?;
    println!("done");

    admin.load().await?;
    if let Some(snapshot) = admin.kyc_view() {
        for request in snapshot.value.pending.unwrap_or_default() {
            println!(
                "Pending review: {} ({})",
                request.full_name,
                request.address.short()
            );
        }
    }

    let approved = admin.approve(creator_address).await?;
    println!("Approved in transaction {:?}", approved.tx_hash());

    let created = creator
        .create_campaign("Compiler school", "Teach compilers to everyone", 3_000)
        .await?;
    let campaign_id = created
        .events()
        .iter()
        .find_map(|event| match event {
            Event::CampaignCreated { id, .. } => Some(*id),
            _ => None,
        })
        .unwrap_or(CampaignId(0));
    println!("Created campaign {}", campaign_id);

    for amount in &[1_000, 2_500] {
        match backer.contribute(campaign_id, *amount).await {
            Ok(_) => println!("Contributed {}", amount),
            Err(error) => println!("Contribution of {} refused: {}", amount, error),
        }
    }

    creator.refresh(scheduler::EntityClass::Campaigns).await?;
    if let Some(snapshot) = creator.campaigns() {
        for view in snapshot.value {
            println!(
                "{} {:?}: {}/{} ({:?}%) {}",
                view.campaign.id,
                view.campaign.title,
                view.campaign.raised,
                view.campaign.goal,
                view.progress.percent,
                view.campaign.status,
            );
            if view.can_withdraw {
                creator.withdraw(view.campaign.id).await?;
                println!("Withdrew funds of {}", view.campaign.id);
            }
        }
    }

    println!("Creator balance: {}", emulator.balance(&creator_address));
    Ok(())
}
