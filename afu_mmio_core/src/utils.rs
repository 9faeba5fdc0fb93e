// Macro to create a bitmask
#[macro_export]
macro_rules! bitmask {
    ( $start_bit:expr,$width:expr ) => {{ ((1 << $width) - 1) << $start_bit }};
    ( $end_bit:expr;$start_bit:expr ) => {
        bitmask!($start_bit, $end_bit - $start_bit + 1)
    };
    ( $width:expr ) => {
        bitmask!(0, $width)
    };
}

// Macro to extract bits from a value
#[macro_export]
macro_rules! bits {
    ( $val:expr,$start_bit:expr,$width:expr ) => {{ ($val >> $start_bit) & ((1 << $width) - 1) }};
    ( $val:expr,$end_bit:expr;$start_bit:expr ) => {
        bits!($val, $start_bit, $end_bit - $start_bit + 1)
    };
    ( $val:expr,$bit:expr ) => {
        bits!($val, $bit, 1)
    };
}

/// helper macro to include test files
#[macro_export]
macro_rules! include_test_file {
    ($file_name:literal) => {
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../test-files/",
            $file_name
        ))
    };
}

#[test]
fn test_bits() {
    let dfh: u64 = 0x1000_0100_0000_2003;

    assert_eq!(bits!(dfh, 63;60), 0x1);
    assert_eq!(bits!(dfh, 40), 0b1);
    assert_eq!(bits!(dfh, 39;16), 0x0);
    assert_eq!(bits!(dfh, 15;12), 0x2);
    assert_eq!(bits!(dfh, 0, 12), 0x003);
}

#[test]
fn test_bitmask() {
    let tid_mask: u32 = bitmask!(9);
    assert_eq!(tid_mask, 0x1FF);

    let offset_mask: u64 = bitmask!(39;16);
    assert_eq!(offset_mask, 0x0000_00FF_FFFF_0000);
    assert_eq!(bitmask!(4, 4), 0xF0);
}
