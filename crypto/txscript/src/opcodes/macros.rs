macro_rules! opcode_serde {
    ($type:ty, $code: expr) => {
        fn deserialize<'i, I: Iterator<Item = &'i u8>, T: VerifiableTransaction>(
            it: &mut I,
        ) -> Result<Box<dyn OpCodeImplementation<T>>, TxScriptError> {
            let len_bytes: Vec<u8> = it.take(size_of::<$type>()).copied().collect();
            if len_bytes.len() != size_of::<$type>() {
                return Err(TxScriptError::MalformedPush(size_of::<$type>(), len_bytes.len()));
            }
            let length = <$type>::from_le_bytes(len_bytes.try_into().expect("length validated above")) as usize;
            let data: Vec<u8> = it.take(length).copied().collect();
            if data.len() != length {
                return Err(TxScriptError::MalformedPush(length, data.len()));
            }
            Ok(Box::new(Self { data }))
        }
    };
    ($length: literal, $code: expr) => {
        fn deserialize<'i, I: Iterator<Item = &'i u8>, T: VerifiableTransaction>(
            it: &mut I,
        ) -> Result<Box<dyn OpCodeImplementation<T>>, TxScriptError> {
            // Static length includes the opcode itself
            let data: Vec<u8> = it.take($length - 1).copied().collect();
            if data.len() != $length - 1 {
                return Err(TxScriptError::MalformedPush($length - 1, data.len()));
            }
            Ok(Box::new(Self { data }))
        }
    };
}

macro_rules! opcode {
    ($name: ident, $num: literal, $length: tt, $code: expr, $self:ident, $vm:ident ) => {
        pub(crate) type $name = OpCode<$num>;

        impl $name {
            opcode_serde!($length, $code);
        }

        impl<T: VerifiableTransaction> OpCodeImplementation<T> for $name {
            #[allow(unused_variables)]
            fn execute(&$self, $vm: &mut TxScriptEngine<T>) -> OpCodeResult {
                $code
            }

            fn value(&self) -> u8 {
                $num
            }

            fn len(&self) -> usize {
                self.data.len()
            }

            fn is_conditional(&self) -> bool {
                matches!($num, codes::OpIf | codes::OpNotIf | codes::OpElse | codes::OpEndIf)
            }

            fn check_minimal_data_push(&self) -> Result<(), TxScriptError> {
                check_minimal_data_push($num, &self.data)
            }
        }
    };
}

macro_rules! opcode_list {
    ( $( opcode $name:ident<$num:literal, $length:tt>($self:ident, $vm:ident) $code: expr ) *)  => {
        $(
            opcode!($name, $num, $length, $code, $self, $vm);
        )*

        /// A module exposing all opcode numbers as constants
        pub mod codes {
            #![allow(non_upper_case_globals)]
            $(
                pub const $name: u8 = $num;
            )*
        }

        pub fn deserialize<'i, I: Iterator<Item = &'i u8>, T: VerifiableTransaction>(
            opcode_num: u8,
            it: &mut I,
        ) -> Result<Box<dyn OpCodeImplementation<T>>, TxScriptError> {
            match opcode_num {
                $(
                    $num => $name::deserialize(it),
                )*
                #[allow(unreachable_patterns)]
                _ => Err(TxScriptError::InvalidOpcode(format!("{opcode_num:#04x}"))),
            }
        }
    };
}

pub(crate) use {opcode, opcode_list, opcode_serde};
