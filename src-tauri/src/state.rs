use ble_scanner::ScannerHandle;

#[derive(Clone)]
pub struct ScannerState {
    pub handle: ScannerHandle,
}

impl ScannerState {
    pub fn new(handle: ScannerHandle) -> Self {
        ScannerState { handle }
    }
}
