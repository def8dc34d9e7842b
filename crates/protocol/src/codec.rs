//! Wire encoding of turret commands
//!
//! Every command travels as a single HID SET_REPORT control transfer. The two
//! families differ only in how the report is laid out:
//!
//! ```text
//! Thunder: wValue 0x0000, data [category, value, 0, 0, 0, 0, 0, 0]
//! Classic: wValue 0x0200, data [value]            (motion only)
//! ```

use crate::command::Action;
use crate::error::{ProtocolError, Result};
use crate::types::{ControlRequest, DeviceFamily, REQUEST_SET_REPORT, REQUEST_TYPE_CLASS_OUT};

/// Length of a Thunder report
pub const THUNDER_REPORT_LEN: usize = 8;

/// wValue used by the classic launcher (output report, id 0)
pub const CLASSIC_REPORT_VALUE: u16 = 0x0200;

/// Encode an action for the given family
///
/// Fails with [`ProtocolError::UnsupportedCapability`] when the family has no
/// encoding for the action's category. The shutdown sentinel never encodes.
///
/// # Example
/// ```
/// use protocol::{Action, DeviceFamily, MotionAction, encode};
///
/// let req = encode(DeviceFamily::Thunder, Action::Motion(MotionAction::Left)).unwrap();
/// assert_eq!(req.data, vec![0x02, 0x04, 0, 0, 0, 0, 0, 0]);
/// ```
pub fn encode(family: DeviceFamily, action: Action) -> Result<ControlRequest> {
    let category = action.category();
    if !family.supports(category) {
        return Err(ProtocolError::UnsupportedCapability { family, category });
    }

    let (category_code, value_code) = action.wire_codes();

    let request = match family {
        DeviceFamily::Thunder => {
            let mut data = vec![0u8; THUNDER_REPORT_LEN];
            data[0] = category_code;
            data[1] = value_code;
            ControlRequest {
                request_type: REQUEST_TYPE_CLASS_OUT,
                request: REQUEST_SET_REPORT,
                value: 0,
                index: 0,
                data,
            }
        }
        DeviceFamily::Classic => ControlRequest {
            request_type: REQUEST_TYPE_CLASS_OUT,
            request: REQUEST_SET_REPORT,
            value: CLASSIC_REPORT_VALUE,
            index: 0,
            data: vec![value_code],
        },
        // supports() already rejected everything for unknown devices
        DeviceFamily::Unknown => {
            return Err(ProtocolError::UnsupportedCapability { family, category });
        }
    };

    Ok(request)
}
