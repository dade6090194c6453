//! Per-opcode handlers. Multi-byte payload fields are little-endian.
use super::{Action, CommandDispatcher, CommandOutcome, Reply};
use crate::{
    devices::{
        flash_controller::{EraseTarget, FlashError, ProtectionMode, ReadProtection, STATUS_OK},
        launcher::JumpTarget,
        memory_map::Area,
        traits::Serial,
    },
    error::Error,
    hal::{
        chip::ChipId,
        crc::CrcUnit,
        flash::FlashInterface,
        memory::ReadMemory,
    },
    log::warn,
    utilities::buffer::CollectSlice,
};

/// FLASH_ERASE sector value requesting every application sector.
pub const MASS_ERASE: u8 = 0xFF;

fn reject(error: Error) -> Action { Action::Respond(CommandOutcome::Rejected(error)) }

fn acknowledge(bytes: &[u8]) -> Action {
    match Reply::from_slice(bytes) {
        Ok(reply) => Action::Respond(CommandOutcome::Acknowledged(reply)),
        Err(_) => reject(Error::MalformedPayload),
    }
}

/// Flash commands are acknowledged with a status byte, failures included.
fn status(result: Result<(), FlashError>) -> Action {
    let status = match result {
        Ok(()) => STATUS_OK,
        Err(error) => {
            warn!("{}", error.description());
            error.status()
        }
    };
    acknowledge(&[status])
}

fn address(bytes: &[u8]) -> u32 { u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) }

/// `[address, length]` payload of the read commands. Zero lengths are malformed.
fn read_request(payload: &[u8]) -> Option<(u32, u8)> {
    match payload {
        [a0, a1, a2, a3, length] if *length > 0 => Some((address(&[*a0, *a1, *a2, *a3]), *length)),
        _ => None,
    }
}

impl<SRL, CRC, MCUF, MEM, ID> CommandDispatcher<SRL, CRC, MCUF, MEM, ID>
where
    SRL: Serial,
    CRC: CrcUnit,
    MCUF: FlashInterface,
    MEM: ReadMemory,
    ID: ChipId,
{
    pub(super) fn get_version(&mut self, _payload: &[u8]) -> Action { acknowledge(&[self.version]) }

    pub(super) fn get_help(&mut self, _payload: &[u8]) -> Action {
        let mut opcodes = [0u8; super::EXTENDED_OPCODES.len()];
        let count = self.opcodes.iter().map(|opcode| *opcode as u8).collect_slice(&mut opcodes);
        acknowledge(&opcodes[..count])
    }

    /// Device id (12 bits) followed by revision id, both as 16 bit words.
    pub(super) fn get_cid(&mut self, _payload: &[u8]) -> Action {
        let id_code = self.chip.id_code();
        let device = (id_code & 0xFFF) as u16;
        let revision = (id_code >> 16) as u16;
        let [d0, d1] = device.to_le_bytes();
        let [r0, r1] = revision.to_le_bytes();
        acknowledge(&[d0, d1, r0, r1])
    }

    pub(super) fn get_rdp_status(&mut self, _payload: &[u8]) -> Action {
        let level = match self.flash.protection().read_protection {
            ReadProtection::Level0 => 0x00,
            ReadProtection::Level1 => 0x01,
        };
        acknowledge(&[level])
    }

    pub(super) fn go_to_address(&mut self, payload: &[u8]) -> Action {
        if payload.len() != 4 {
            return reject(Error::MalformedPayload);
        }
        let target = address(payload);
        if self.flash.map().is_executable(target) {
            Action::Jump(JumpTarget(target))
        } else {
            reject(Error::InvalidAddress)
        }
    }

    pub(super) fn flash_erase(&mut self, payload: &[u8]) -> Action {
        let target = match *payload {
            [MASS_ERASE, _] => EraseTarget::Mass,
            [first, count] if count > 0 => EraseTarget::Sectors { first, count },
            _ => return reject(Error::MalformedPayload),
        };
        status(self.flash.erase(target))
    }

    /// `[address, length, bytes..]`
    pub(super) fn mem_write(&mut self, payload: &[u8]) -> Action {
        if payload.len() < 5 {
            return reject(Error::MalformedPayload);
        }
        let (header, data) = payload.split_at(5);
        let length = header[4] as usize;
        if length == 0 || data.len() != length {
            return reject(Error::MalformedPayload);
        }
        status(self.flash.program(address(header), data))
    }

    /// `[sector bitmap.., mode]`, with one bitmap bit per sector.
    pub(super) fn enable_rw_protect(&mut self, payload: &[u8]) -> Action {
        let bitmap_len = self.flash.map().bitmap_len();
        if payload.len() != bitmap_len + 1 {
            return reject(Error::MalformedPayload);
        }
        let (bitmap, mode) = payload.split_at(bitmap_len);
        let Ok(mode) = ProtectionMode::try_from(mode[0]) else {
            return reject(Error::MalformedPayload);
        };
        let mut sectors = [0u8; 4];
        bitmap.iter().copied().collect_slice(&mut sectors);
        status(self.flash.protect(u32::from_le_bytes(sectors), mode))
    }

    pub(super) fn mem_read(&mut self, payload: &[u8]) -> Action {
        let Some((address, length)) = read_request(payload) else {
            return reject(Error::MalformedPayload);
        };
        let mut reply = Reply::new();
        if reply.resize(length as usize, 0).is_err() {
            return reject(Error::MalformedPayload);
        }
        match self.flash.map().readable_area(address, length as u32) {
            Some(Area::Flash) => {
                if self.flash.protection().read_protection == ReadProtection::Level1 {
                    return reject(Error::ReadProtected);
                }
                if let Err(error) = self.flash.read(address, &mut reply) {
                    return reject(error.into());
                }
            }
            Some(Area::Ram) | Some(Area::SystemMemory) => self.memory.read(address, &mut reply),
            None => return reject(Error::InvalidAddress),
        }
        Action::Respond(CommandOutcome::Acknowledged(reply))
    }

    pub(super) fn read_sector_status(&mut self, _payload: &[u8]) -> Action {
        let bitmap = self.flash.protection().write_protected.to_le_bytes();
        acknowledge(&bitmap[..self.flash.map().bitmap_len()])
    }

    pub(super) fn otp_read(&mut self, payload: &[u8]) -> Action {
        let Some((address, length)) = read_request(payload) else {
            return reject(Error::MalformedPayload);
        };
        if !self.flash.map().otp.contains_range(address, length as u32) {
            return reject(Error::InvalidAddress);
        }
        let mut reply = Reply::new();
        if reply.resize(length as usize, 0).is_err() {
            return reject(Error::MalformedPayload);
        }
        self.memory.read(address, &mut reply);
        Action::Respond(CommandOutcome::Acknowledged(reply))
    }

    pub(super) fn disable_rw_protect(&mut self, _payload: &[u8]) -> Action {
        status(self.flash.unprotect_all())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::devices::{
        dispatcher::{
            test::{dispatcher, exchange, TestDispatcher},
            EXTENDED_OPCODES,
        },
        frame::{test::frame, ACK, NACK},
    };

    const APPLICATION: u32 = 0x0800_8000;

    fn extended() -> TestDispatcher { dispatcher(&[]).with_opcodes(&EXTENDED_OPCODES) }

    fn write_request(address: u32, bytes: &[u8]) -> Vec<u8> {
        let mut payload = address.to_le_bytes().to_vec();
        payload.push(bytes.len() as u8);
        payload.extend_from_slice(bytes);
        frame(0x57, &payload)
    }

    fn read_request(opcode: u8, address: u32, length: u8) -> Vec<u8> {
        let mut payload = address.to_le_bytes().to_vec();
        payload.push(length);
        frame(opcode, &payload)
    }

    #[test]
    fn version_ignores_payload() {
        let sent = exchange(&mut dispatcher(&[]), &[frame(0x51, &[1, 2, 3])]);
        assert_eq!(sent, [ACK, 0x01, 0x10]);
    }

    #[test]
    fn chip_id_splits_device_and_revision() {
        let sent = exchange(&mut dispatcher(&[]), &[frame(0x53, &[])]);
        assert_eq!(sent, [ACK, 0x04, 0x10, 0x04, 0x00, 0x20]);
    }

    #[test]
    fn erasing_is_idempotent() {
        // Given
        let mut dispatcher = dispatcher(&[]);
        dispatcher.flash().interface().write_contents(0x0800_9000, &[0x00; 0x100]);

        // When
        let sent = exchange(&mut dispatcher, &[frame(0x56, &[9, 1]), frame(0x56, &[9, 1])]);

        // Then
        assert_eq!(sent, [ACK, 0x01, 0x00, ACK, 0x01, 0x00]);
        let contents = dispatcher.flash().interface().contents(0x0800_9000, 0x1000).to_vec();
        assert!(contents.iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn erasing_the_bootloader_reports_out_of_range() {
        // Given
        let mut dispatcher = dispatcher(&[]);
        dispatcher.flash().interface().write_contents(0x0800_0000, &[0x00; 4]);

        // When
        let sent = exchange(&mut dispatcher, &[frame(0x56, &[0, 1]), frame(0x56, &[MASS_ERASE, 0])]);

        // Then
        assert_eq!(sent, [ACK, 0x01, 0x01, ACK, 0x01, 0x00]);
        assert_eq!(dispatcher.flash().interface().contents(0x0800_0000, 4), &[0x00; 4]);
    }

    #[test]
    fn malformed_erase_requests_are_rejected() {
        let sent = exchange(
            &mut dispatcher(&[]),
            &[frame(0x56, &[9, 0]), frame(0x56, &[9]), frame(0x56, &[9, 1, 1])],
        );
        assert_eq!(sent, [NACK, NACK, NACK]);
    }

    #[test]
    fn stuck_controller_is_reported_as_timeout() {
        // Given
        let mut dispatcher = extended();
        dispatcher.flash().interface().stuck_busy = true;

        // When
        let sent = exchange(
            &mut dispatcher,
            &[frame(0x56, &[9, 1]), frame(0x58, &[0x00, 0x81, 0x01]), frame(0x54, &[])],
        );

        // Then
        assert_eq!(sent, [ACK, 0x01, 0x04, ACK, 0x01, 0x04, ACK, 0x01, 0x00]);
        assert!(dispatcher.flash().interface().locked);
    }

    #[test]
    fn written_bytes_read_back() {
        // Given
        let mut dispatcher = extended();
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];

        // When
        let sent = exchange(
            &mut dispatcher,
            &[write_request(APPLICATION + 0x10, &data), read_request(0x59, APPLICATION + 0x10, 5)],
        );

        // Then
        assert_eq!(sent, [ACK, 0x01, 0x00, ACK, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05]);
    }

    #[test]
    fn writing_a_protected_sector_changes_nothing() {
        // Given
        let mut dispatcher = extended();
        let before = dispatcher.flash().interface().data.clone();
        let protect = frame(0x58, &[0x00, 0x02, 0x01]);

        // When
        let sent = exchange(&mut dispatcher, &[protect, write_request(0x0800_9000, &[0x12, 0x34])]);

        // Then
        assert_eq!(sent, [ACK, 0x01, 0x00, ACK, 0x01, 0x02]);
        assert_eq!(dispatcher.flash().interface().data, before);
    }

    #[test]
    fn write_failures_are_reported_as_status() {
        let sent = exchange(
            &mut dispatcher(&[]),
            &[write_request(APPLICATION + 1, &[0x00]), write_request(0x0800_7000, &[0x00, 0x00])],
        );
        assert_eq!(sent, [ACK, 0x01, 0x05, ACK, 0x01, 0x01]);
    }

    #[test]
    fn malformed_writes_are_rejected() {
        // Given
        let mut short = write_request(APPLICATION, &[0x00, 0x00]);
        short[6] = 3;
        let short = frame(0x57, &short[2..short.len() - 4]);

        // When
        let sent = exchange(
            &mut dispatcher(&[]),
            &[short, write_request(APPLICATION, &[]), frame(0x57, &[0x00, 0x80])],
        );

        // Then
        assert_eq!(sent, [NACK, NACK, NACK]);
    }

    #[test]
    fn reading_ram_and_refusing_bad_ranges() {
        let sent = exchange(
            &mut extended(),
            &[
                read_request(0x59, 0x2000_0000, 4),
                read_request(0x59, 0x4000_0000, 4),
                read_request(0x59, 0x0800_FFFF, 2),
                read_request(0x59, 0x2000_0000, 0),
            ],
        );
        assert_eq!(sent, [ACK, 0x04, 0xC0, 0xFF, 0xEE, 0x00, NACK, NACK, NACK]);
    }

    #[test]
    fn read_protection_blocks_flash_reads() {
        // Given
        let mut dispatcher = extended();

        // When
        let sent = exchange(
            &mut dispatcher,
            &[
                frame(0x54, &[]),
                frame(0x58, &[0x00, 0x00, 0x02]),
                frame(0x54, &[]),
                read_request(0x59, APPLICATION, 4),
                read_request(0x59, 0x2000_0000, 1),
            ],
        );

        // Then
        assert_eq!(
            sent,
            [ACK, 0x01, 0x00, ACK, 0x01, 0x00, ACK, 0x01, 0x01, NACK, ACK, 0x01, 0xC0]
        );
    }

    #[test]
    fn sector_status_tracks_protection_requests() {
        // Given
        let mut dispatcher = extended();

        // When
        let sent = exchange(
            &mut dispatcher,
            &[
                frame(0x5A, &[]),
                frame(0x58, &[0x00, 0x81, 0x01]),
                frame(0x5A, &[]),
                frame(0x5C, &[]),
                frame(0x5A, &[]),
            ],
        );

        // Then
        assert_eq!(
            sent,
            [
                ACK, 0x02, 0x00, 0x00, //
                ACK, 0x01, 0x00, //
                ACK, 0x02, 0x00, 0x81, //
                ACK, 0x01, 0x00, //
                ACK, 0x02, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn removing_write_protection_keeps_read_protection() {
        let sent = exchange(
            &mut extended(),
            &[frame(0x58, &[0x01, 0x00, 0x02]), frame(0x5C, &[]), frame(0x54, &[])],
        );
        assert_eq!(sent, [ACK, 0x01, 0x00, ACK, 0x01, 0x00, ACK, 0x01, 0x01]);
    }

    #[test]
    fn malformed_protection_requests_are_rejected() {
        let sent = exchange(
            &mut extended(),
            &[frame(0x58, &[0x00, 0x01, 0x03]), frame(0x58, &[0x01, 0x01]), frame(0x58, &[0x00, 0x00, 0x00, 0x01, 0x01])],
        );
        assert_eq!(sent, [NACK, NACK, NACK]);
    }

    #[test]
    fn otp_reads_are_confined_to_the_window() {
        let sent = exchange(
            &mut extended(),
            &[read_request(0x5B, 0x1FFF_F7E0, 4), read_request(0x5B, 0x1FFF_F7FC, 8)],
        );
        assert_eq!(sent, [ACK, 0x04, 0x12, 0x34, 0x56, 0x78, NACK]);
    }

    #[test]
    fn jumps_outside_executable_memory_are_rejected() {
        let sent = exchange(
            &mut dispatcher(&[]),
            &[frame(0x55, &0x4001_3800u32.to_le_bytes()), frame(0x55, &[0x00, 0x80])],
        );
        assert_eq!(sent, [NACK, NACK]);
    }
}
