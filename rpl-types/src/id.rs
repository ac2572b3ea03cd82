//! The closed manifest of object type tags and command opcodes.
//!
//! Every value the runtime can hold starts with one of these ids encoded
//! as an unsigned LEB128 varint. The whole universe is declared in a
//! single [`ids!`] invocation so the enum, the name table, the arity
//! table and the precedence table cannot drift apart.

use core::fmt;

use num_enum::TryFromPrimitive;

/// Number of stack inputs a command consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly this many inputs.
    Fixed(u8),
    /// A count argument on level 1 followed by that many further inputs.
    Variadic(u8),
}

impl Arity {
    /// Minimum number of stack levels the command touches.
    pub const fn min_depth(self) -> usize {
        match self {
            Arity::Fixed(n) => n as usize,
            Arity::Variadic(n) => n as usize,
        }
    }
}

/// Operator precedence used by the expression parser and renderer.
///
/// Higher binds tighter. `Atom` never needs parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Precedence {
    /// Not an algebraic entity.
    None = 0,
    /// `=` at the top level of an expression.
    Assignment = 1,
    /// Based-integer logical operators.
    Logical = 2,
    /// `+` and `-`.
    Additive = 3,
    /// `*`, `/`, `mod`, `rem`.
    Multiplicative = 5,
    /// `^`.
    Power = 7,
    /// Unary prefix minus.
    Unary = 9,
    /// Named functions, rendered as `f(x)`.
    Function = 11,
    /// Literals, symbols and constants.
    Atom = 13,
}

macro_rules! ids {
    ($(
        #[doc = $doc:literal]
        $code:literal $Name:ident $text:literal arity $arity:literal prec $prec:ident;
    )*) => {
        /// Object type tag and command opcode, the first varint of every
        /// object record.
        ///
        /// The set is closed: adding a variant means adding one row to the
        /// `ids!` table, which also extends the name, arity and precedence
        /// tables.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, strum::EnumIter)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u8)]
        pub enum Id {
            $(
                #[doc = $doc]
                $Name = $code,
            )*
        }

        impl Id {
            /// Canonical source text, empty for ids that render from their
            /// payload (numbers, text, containers).
            pub const fn name(self) -> &'static str {
                match self {
                    $(Id::$Name => $text,)*
                }
            }

            /// Declared number of stack inputs. Negative table entries
            /// denote a variable arity with that many prefix items.
            pub const fn arity(self) -> Arity {
                match self {
                    $(Id::$Name => {
                        let raw: i16 = $arity;
                        if raw < 0 {
                            Arity::Variadic((-raw) as u8)
                        } else {
                            Arity::Fixed(raw as u8)
                        }
                    })*
                }
            }

            /// Rendering/parsing precedence.
            pub const fn precedence(self) -> Precedence {
                match self {
                    $(Id::$Name => Precedence::$prec,)*
                }
            }
        }

        paste::paste! {
            /// Raw tag values, usable in `const` contexts and encodings.
            pub mod tag {
                $(
                    #[doc = $doc]
                    pub const [<$Name:snake:upper>]: u8 = $code;
                )*
            }
        }
    };
}

ids! {
    /// Positive machine integer, LEB128 magnitude.
    0x01 Integer          ""         arity 0  prec Atom;
    /// Negative machine integer, LEB128 magnitude.
    0x02 NegInteger       ""         arity 0  prec Atom;
    /// Integer with explicit base and word-size mask.
    0x03 BasedInteger     ""         arity 0  prec Atom;
    /// Positive big integer, big-endian magnitude.
    0x04 Bignum           ""         arity 0  prec Atom;
    /// Negative big integer.
    0x05 NegBignum        ""         arity 0  prec Atom;
    /// Positive fraction of machine integers.
    0x06 Fraction         ""         arity 0  prec Atom;
    /// Negative fraction of machine integers.
    0x07 NegFraction      ""         arity 0  prec Atom;
    /// Positive fraction with bignum parts.
    0x08 BigFraction      ""         arity 0  prec Atom;
    /// Negative fraction with bignum parts.
    0x09 NegBigFraction   ""         arity 0  prec Atom;
    /// Positive arbitrary-precision decimal.
    0x0A Decimal          ""         arity 0  prec Atom;
    /// Negative arbitrary-precision decimal.
    0x0B NegDecimal       ""         arity 0  prec Atom;
    /// Hardware 32-bit float, raw little-endian bits.
    0x0C HwFloat          ""         arity 0  prec Atom;
    /// Hardware 64-bit float, raw little-endian bits.
    0x0D HwDouble         ""         arity 0  prec Atom;
    /// Complex number in rectangular form, two children.
    0x0E Rectangular      ""         arity 0  prec Atom;
    /// Complex number in polar form, argument in pi units.
    0x0F Polar            ""         arity 0  prec Atom;
    /// Interval between two endpoints.
    0x10 Range            ""         arity 0  prec Atom;
    /// Interval presented as centre plus/minus delta.
    0x11 DeltaRange       ""         arity 0  prec Atom;
    /// Interval presented as centre plus/minus percentage.
    0x12 PercentRange     ""         arity 0  prec Atom;
    /// Mean and standard deviation.
    0x13 Uncertain        ""         arity 0  prec Atom;
    /// Value attached to a unit expression.
    0x14 Unit             ""         arity 0  prec Atom;
    /// Identifier, UTF-8 payload.
    0x15 Symbol           ""         arity 0  prec Atom;
    /// Text string, UTF-8 payload.
    0x16 Text             ""         arity 0  prec Atom;
    /// Ordered sequence of objects.
    0x17 List             ""         arity 0  prec Atom;
    /// Vector or matrix of objects.
    0x18 Array            ""         arity 0  prec Atom;
    /// Symbolic expression, postfix body.
    0x19 Expression       ""         arity 0  prec Atom;
    /// Executable sequence delimited by guillemets.
    0x1A Program          ""         arity 0  prec Atom;
    /// Executable sequence evaluated inline, no guillemets.
    0x1B Block            ""         arity 0  prec Atom;
    /// Label attached to a value.
    0x1C Tagged           ""         arity 0  prec Atom;
    /// Monochrome bitmap.
    0x1D Grob             ""         arity 0  prec Atom;
    /// 16-bpp color bitmap.
    0x1E Pixmap           ""         arity 0  prec Atom;
    /// Named built-in constant.
    0x1F Constant         ""         arity 0  prec Atom;
    /// Named library equation.
    0x20 Equation         ""         arity 0  prec Atom;
    /// Named library item.
    0x21 Library          ""         arity 0  prec Atom;
    /// Function application inside an expression, name + argument count.
    0x22 Call             ""         arity 0  prec Function;

    /// The imaginary unit.
    0x28 ImaginaryUnit    "ⅈ"        arity 0  prec Atom;
    /// Positive infinity.
    0x29 Infinity         "∞"        arity 0  prec Atom;
    /// Negative infinity.
    0x2A NegInfinity      "-∞"       arity 0  prec Atom;
    /// Result of an undefined operation.
    0x2B Undefined        "?"        arity 0  prec Atom;

    /// Addition.
    0x30 Add              "+"        arity 2  prec Additive;
    /// Subtraction.
    0x31 Sub              "-"        arity 2  prec Additive;
    /// Multiplication.
    0x32 Mul              "*"        arity 2  prec Multiplicative;
    /// Division.
    0x33 Div              "/"        arity 2  prec Multiplicative;
    /// Euclidean remainder, result in `[0, |y|)`.
    0x34 Mod              "mod"      arity 2  prec Multiplicative;
    /// Remainder keeping the sign of the dividend.
    0x35 Rem              "rem"      arity 2  prec Multiplicative;
    /// Exponentiation.
    0x36 Pow              "^"        arity 2  prec Power;
    /// Euclidean norm of two reals.
    0x37 Hypot            "hypot"    arity 2  prec Function;
    /// Two-argument arc tangent.
    0x38 Atan2            "atan2"    arity 2  prec Function;
    /// Assignment or equation.
    0x39 Equal            "="        arity 2  prec Assignment;

    /// Sign change.
    0x40 Neg              "neg"      arity 1  prec Function;
    /// Multiplicative inverse.
    0x41 Inv              "inv"      arity 1  prec Function;
    /// Square.
    0x42 Sq               "sq"       arity 1  prec Function;
    /// Square root.
    0x43 Sqrt             "sqrt"     arity 1  prec Function;
    /// Natural exponential.
    0x44 Exp              "exp"      arity 1  prec Function;
    /// Natural logarithm.
    0x45 Ln               "ln"       arity 1  prec Function;
    /// Sine.
    0x46 Sin              "sin"      arity 1  prec Function;
    /// Cosine.
    0x47 Cos              "cos"      arity 1  prec Function;
    /// Tangent.
    0x48 Tan              "tan"      arity 1  prec Function;
    /// Absolute value or complex modulus.
    0x49 Abs              "abs"      arity 1  prec Function;

    /// Bitwise and of based integers.
    0x50 And              "and"      arity 2  prec Logical;
    /// Bitwise or of based integers.
    0x51 Or               "or"       arity 2  prec Logical;
    /// Bitwise exclusive or of based integers.
    0x52 Xor              "xor"      arity 2  prec Logical;
    /// Bitwise complement within the word-size mask.
    0x53 BitNot           "not"      arity 1  prec Function;
    /// Shift left within the word-size mask.
    0x54 ShiftLeft        "sl"       arity 1  prec Function;
    /// Shift right.
    0x55 ShiftRight       "sr"       arity 1  prec Function;

    /// Duplicate level 1.
    0x60 Dup              "dup"      arity 1  prec None;
    /// Drop level 1.
    0x61 Drop             "drop"     arity 1  prec None;
    /// Exchange levels 1 and 2.
    0x62 Swap             "swap"     arity 2  prec None;
    /// Copy level 2 to level 1.
    0x63 Over             "over"     arity 2  prec None;
    /// Rotate the top three levels.
    0x64 Rot              "rot"      arity 3  prec None;
    /// Copy level n to level 1.
    0x65 Pick             "pick"     arity -1 prec None;
    /// Move level n to level 1.
    0x66 Roll             "roll"     arity -1 prec None;
    /// Move level 1 to level n.
    0x67 RollDown         "rolld"    arity -1 prec None;
    /// Push the stack depth.
    0x68 Depth            "depth"    arity 0  prec None;
    /// Empty the stack.
    0x69 ClearStack       "clear"    arity 0  prec None;
    /// Duplicate the top n levels.
    0x6A DupN             "dupn"     arity -1 prec None;
    /// Drop the top n levels.
    0x6B DropN            "dropn"    arity -1 prec None;

    /// Evaluate level 1.
    0x70 Eval             "eval"     arity 1  prec None;
    /// Suspend the current program.
    0x71 Halt             "halt"     arity 0  prec None;
    /// Restore the stack saved before the last command line.
    0x72 Undo             "undo"     arity 0  prec None;

    /// Store value into name.
    0x78 Store            "sto"      arity 2  prec None;
    /// Recall value of name.
    0x79 Recall           "rcl"      arity 1  prec None;
    /// Delete a variable.
    0x7A Purge            "purge"    arity 1  prec None;
    /// Leave the current directory.
    0x7B UpDir            "updir"    arity 0  prec None;
    /// Return to the root directory.
    0x7C Home             "home"     arity 0  prec None;
    /// Create and enter a subdirectory.
    0x7D CrDir            "crdir"    arity 1  prec None;

    /// Extract an element of a container.
    0x80 Get              "get"      arity 2  prec None;
    /// Replace an element of a container.
    0x81 Put              "put"      arity 3  prec None;
    /// Push the size of a container.
    0x82 Size             "size"     arity 1  prec None;

    /// Convert a unit value to another unit.
    0x88 Convert          "convert"  arity 2  prec None;
    /// Convert a unit value to base units.
    0x89 UBase            "ubase"    arity 1  prec None;
    /// Strip the unit from a unit value.
    0x8A UVal             "uval"     arity 1  prec None;

    /// Symbolic derivative with respect to a symbol.
    0x90 Differentiate    "deriv"    arity 2  prec Function;
    /// Symbolic primitive with respect to a symbol.
    0x91 Integrate        "integ"    arity 2  prec Function;

    /// Number of days between two dates.
    0x98 DaysBetween      "ddays"    arity 2  prec None;
    /// Date a number of days after a date.
    0x99 DateAdd          "dateadd"  arity 2  prec None;
    /// Date a number of days before a date.
    0x9A DateSub          "datesub"  arity 2  prec None;
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name().is_empty() {
            write!(f, "{self:?}")
        } else {
            f.write_str(self.name())
        }
    }
}

impl Id {
    /// Machine or big integer, based or not.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Id::Integer | Id::NegInteger | Id::BasedInteger | Id::Bignum | Id::NegBignum
        )
    }

    /// Based integer, treated as a bit pattern.
    pub const fn is_based(self) -> bool {
        matches!(self, Id::BasedInteger)
    }

    /// Fraction of integers or bignums.
    pub const fn is_fraction(self) -> bool {
        matches!(
            self,
            Id::Fraction | Id::NegFraction | Id::BigFraction | Id::NegBigFraction
        )
    }

    /// Arbitrary-precision decimal.
    pub const fn is_decimal(self) -> bool {
        matches!(self, Id::Decimal | Id::NegDecimal)
    }

    /// Hardware float or double.
    pub const fn is_hwfp(self) -> bool {
        matches!(self, Id::HwFloat | Id::HwDouble)
    }

    /// Any real scalar: integer, bignum, fraction, decimal or hardware fp.
    pub const fn is_real(self) -> bool {
        self.is_integer() || self.is_fraction() || self.is_decimal() || self.is_hwfp()
    }

    /// Complex in either presentation form.
    pub const fn is_complex(self) -> bool {
        matches!(self, Id::Rectangular | Id::Polar)
    }

    /// Interval in any presentation form, or uncertain.
    pub const fn is_range(self) -> bool {
        matches!(
            self,
            Id::Range | Id::DeltaRange | Id::PercentRange | Id::Uncertain
        )
    }

    /// Symbol, expression or named constant: evaluates symbolically.
    pub const fn is_symbolic(self) -> bool {
        matches!(
            self,
            Id::Symbol | Id::Expression | Id::Constant | Id::Equation | Id::ImaginaryUnit
        )
    }

    /// Usable as an argument inside an expression.
    pub const fn is_algebraic(self) -> bool {
        self.is_real()
            || self.is_complex()
            || self.is_range()
            || self.is_symbolic()
            || matches!(
                self,
                Id::Unit | Id::Infinity | Id::NegInfinity | Id::Undefined
            )
    }

    /// Container embedding child objects by value.
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Id::List | Id::Array | Id::Expression | Id::Program | Id::Block
        )
    }

    /// Executable primitive with a tag-only record.
    pub const fn is_command(self) -> bool {
        (self as u8) >= tag::ADD
    }

    /// Binary operator rendered infix inside expressions.
    pub const fn is_infix(self) -> bool {
        matches!(
            self,
            Id::Add
                | Id::Sub
                | Id::Mul
                | Id::Div
                | Id::Mod
                | Id::Rem
                | Id::Pow
                | Id::And
                | Id::Or
                | Id::Xor
        )
    }
}
