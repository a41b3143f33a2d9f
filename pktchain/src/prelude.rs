// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

pub use crate::error::{PacketError, ValidationError, ValidationErrorClass};
pub use crate::layers::l2::{Ether, EtherMut, EtherRef, ETH_PROTOCOL_MACSEC};
pub use crate::layers::macsec::{Macsec, MacsecMut, MacsecRef, TciFlags};
pub use crate::layers::traits::*;
pub use crate::layers::{Raw, RawMut, RawRef};
pub use crate::packet::{LayerInfo, Packet};
pub use crate::registry::LayerRegistry;
pub use crate::{FrameBuffer, LinkType};
