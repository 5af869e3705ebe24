//! Mock reader scripts for the demo scenarios.

use tagreader_core::{CardUid, Result};
use tagreader_hardware::mock::{MockBehavior, MockReaderHandle};

use crate::cli::Scenario;

/// UID and block 4 contents of the demo card.
const DEMO_UID: &str = "8f82d28f";
const DEMO_BLOCK: &str = "159";

fn demo_card() -> Result<MockBehavior> {
    let uid: CardUid = DEMO_UID.parse()?;
    Ok(MockBehavior::card(uid, &[(4, DEMO_BLOCK)]))
}

/// Script `reader` for `scenario`.
pub fn install(scenario: Scenario, reader: &MockReaderHandle) -> Result<()> {
    match scenario {
        Scenario::Clean => reader.set_fallback(demo_card()?),
        Scenario::NoCard => reader.set_fallback(MockBehavior::NoCard),
        Scenario::ConfigureFault => {
            reader.push(MockBehavior::ConfigureFault);
            reader.set_fallback(demo_card()?);
        }
        Scenario::Cascade => reader.set_fallback(MockBehavior::PollFault),
        Scenario::Recover => {
            for _ in 0..2 {
                reader.push_all([
                    MockBehavior::PollFault,
                    MockBehavior::ConfigureFault,
                    MockBehavior::ReadFault,
                ]);
            }
            reader.set_fallback(demo_card()?);
        }
    }

    Ok(())
}
