// Envelope codec: layout, bounds on write and read, truncation reporting.

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use envelock_core::envelope::{
        decode_header, encode_header, read_header, write_header, EnvelopeError, EnvelopeField,
    };
    use proptest::prelude::*;

    fn crafted(iv_len: u32, iv: &[u8], wk_len: u32, wk: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&iv_len.to_be_bytes());
        buf.extend_from_slice(iv);
        buf.extend_from_slice(&wk_len.to_be_bytes());
        buf.extend_from_slice(wk);
        buf
    }

    #[test]
    fn layout_is_big_endian_length_prefixed() {
        let iv = [0xAAu8; 16];
        let wk = [0xBBu8; 256];
        let bytes = encode_header(&iv, &wk).unwrap();

        assert_eq!(&bytes[0..4], &[0, 0, 0, 16]);
        assert_eq!(&bytes[4..20], &iv);
        assert_eq!(&bytes[20..24], &[0, 0, 1, 0]);
        assert_eq!(&bytes[24..], &wk[..]);
    }

    #[test]
    fn read_stops_at_ciphertext() {
        let mut bytes = encode_header(&[1u8; 16], &[2u8; 128]).unwrap();
        bytes.extend_from_slice(b"ciphertext follows");

        let mut cur = Cursor::new(&bytes);
        let header = read_header(&mut cur).unwrap();
        assert_eq!(header.iv, vec![1u8; 16]);
        assert_eq!(header.wrapped_key, vec![2u8; 128]);
        assert_eq!(cur.position() as usize, header.encoded_len());
        assert_eq!(&bytes[cur.position() as usize..], b"ciphertext follows");
    }

    #[test]
    fn accepts_bounds_inclusive() {
        let bytes = encode_header(&[7u8; 64], &vec![9u8; 8192]).unwrap();
        let (header, used) = decode_header(&bytes).unwrap();
        assert_eq!(header.iv.len(), 64);
        assert_eq!(header.wrapped_key.len(), 8192);
        assert_eq!(used, bytes.len());
    }

    // Rejected lengths arrive with no payload behind them: a reader that
    // tried to fill a buffer first would report truncation instead.
    #[test]
    fn rejects_iv_length_zero() {
        let err = read_header(&mut Cursor::new(crafted(0, &[], 0, &[]))).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidIvLength { have: 0, .. }), "{err}");
    }

    #[test]
    fn rejects_iv_length_65() {
        let err = read_header(&mut Cursor::new(65u32.to_be_bytes().to_vec())).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidIvLength { have: 65, max: 64 }), "{err}");
    }

    #[test]
    fn rejects_wrapped_key_length_zero() {
        let err = read_header(&mut Cursor::new(crafted(16, &[0u8; 16], 0, &[]))).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidWrappedKeyLength { have: 0, .. }), "{err}");
    }

    #[test]
    fn rejects_wrapped_key_length_8193() {
        let err = read_header(&mut Cursor::new(crafted(16, &[0u8; 16], 8193, &[]))).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidWrappedKeyLength { have: 8193, max: 8192 }), "{err}");
    }

    #[test]
    fn rejects_huge_lengths_without_allocating() {
        let err = read_header(&mut Cursor::new(u32::MAX.to_be_bytes().to_vec())).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidIvLength { .. }));

        let err = read_header(&mut Cursor::new(crafted(16, &[0u8; 16], u32::MAX, &[]))).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidWrappedKeyLength { .. }));
    }

    #[test]
    fn reports_which_field_was_truncated() {
        let full = encode_header(&[1u8; 16], &[2u8; 128]).unwrap();
        let cases = [
            (0usize, EnvelopeField::IvLength),
            (3, EnvelopeField::IvLength),
            (4, EnvelopeField::Iv),
            (19, EnvelopeField::Iv),
            (20, EnvelopeField::WrappedKeyLength),
            (23, EnvelopeField::WrappedKeyLength),
            (24, EnvelopeField::WrappedKey),
            (full.len() - 1, EnvelopeField::WrappedKey),
        ];
        for (cut, expected) in cases {
            let err = read_header(&mut Cursor::new(&full[..cut])).unwrap_err();
            match err {
                EnvelopeError::Truncated { field } => assert_eq!(field, expected, "cut={cut}"),
                other => panic!("cut={cut}: unexpected {other}"),
            }
        }
    }

    #[test]
    fn write_rejects_out_of_bounds_and_writes_nothing() {
        let mut sink = Vec::new();
        assert!(matches!(
            write_header(&mut sink, &[], &[1u8; 16]),
            Err(EnvelopeError::InvalidIvLength { .. })
        ));
        assert!(matches!(
            write_header(&mut sink, &[0u8; 65], &[1u8; 16]),
            Err(EnvelopeError::InvalidIvLength { .. })
        ));
        assert!(matches!(
            write_header(&mut sink, &[0u8; 16], &[]),
            Err(EnvelopeError::InvalidWrappedKeyLength { .. })
        ));
        assert!(matches!(
            write_header(&mut sink, &[0u8; 16], &vec![1u8; 8193]),
            Err(EnvelopeError::InvalidWrappedKeyLength { .. })
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = read_header(&mut Cursor::new(65u32.to_be_bytes().to_vec())).unwrap_err();
        assert!(err.to_string().contains("iv length 65"));
        let err = read_header(&mut Cursor::new(vec![0u8, 0])).unwrap_err();
        assert!(err.to_string().contains("iv length"));
    }

    proptest! {
        #[test]
        fn arbitrary_input_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = decode_header(&bytes);
        }

        #[test]
        fn valid_headers_decode(iv_len in 1usize..=64, wk_len in 1usize..=600) {
            let iv = vec![0x11u8; iv_len];
            let wk = vec![0x22u8; wk_len];
            let bytes = encode_header(&iv, &wk).unwrap();
            let (header, used) = decode_header(&bytes).unwrap();
            prop_assert_eq!(header.iv, iv);
            prop_assert_eq!(header.wrapped_key, wk);
            prop_assert_eq!(used, bytes.len());
        }
    }
}
