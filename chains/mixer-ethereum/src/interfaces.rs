#![allow(clippy::all)]
#![allow(missing_docs)]

use ethers::prelude::abigen;

abigen!(Mixer, "$CARGO_MANIFEST_DIR/abis/Mixer.abi.json");
